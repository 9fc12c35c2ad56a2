use std::fmt::{self, Display};

use rads_catalog::types::{CatalogPage, FilterState, Package, PackageStats};

const DEFAULT_DESCRIPTION: &str = "<no description provided>";

/// Compact counter used in listings: `999`, `1.2k`, `3.4M`.
pub fn format_count(n: u64) -> String {
    match n {
        0..1_000 => n.to_string(),
        1_000..1_000_000 => format!("{:.1}k", n as f64 / 1_000.0),
        _ => format!("{:.1}M", n as f64 / 1_000_000.0),
    }
}

/// Calendar date of an RFC 3339 timestamp, or the raw value if it doesn't parse.
pub fn format_updated(stats: &PackageStats) -> String {
    match (stats.last_updated_at(), &stats.last_updated) {
        (Some(date), _) => date.format("%Y-%m-%d").to_string(),
        (None, Some(raw)) => raw.clone(),
        (None, None) => "unknown".to_string(),
    }
}

/// A listing page rendered as a name/description table.
pub struct DisplayListing<'a> {
    pub page: &'a CatalogPage,
}

impl Display for DisplayListing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let column_width = self
            .page
            .items
            .iter()
            .map(|p| p.name.len())
            .max()
            .unwrap_or_default();

        let mut items = self.page.items.iter().peekable();
        while let Some(package) = items.next() {
            let desc = match package.description.trim() {
                "" => DEFAULT_DESCRIPTION,
                desc => desc,
            };
            write!(
                f,
                "{name:<column_width$}  {desc}  (⬇ {downloads}, ★ {stars})",
                name = package.name,
                desc = desc.replace('\n', " "),
                downloads = format_count(package.stats.downloads),
                stars = format_count(package.stats.stars),
            )?;
            // Only print a newline if there are more items to print
            if items.peek().is_some() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// One line summary of the active filters and result count.
pub fn listing_summary(filters: &FilterState, page: &CatalogPage) -> String {
    let mut summary = format!("{} packages found", page.total);
    if let Some(query) = &filters.query {
        summary.push_str(&format!(" for '{query}'"));
    }
    let active = filters.active_filter_count();
    match active {
        0 => {},
        1 => summary.push_str(" (1 filter active)"),
        n => summary.push_str(&format!(" ({n} filters active)")),
    }
    summary
}

/// The details of a single package.
pub struct DisplayPackage<'a>(pub &'a Package);

impl Display for DisplayPackage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let package = self.0;
        let version = package
            .latest_version
            .as_deref()
            .unwrap_or(package.version.as_str());

        writeln!(f, "{} - {}", package.name, package.title())?;
        if !package.description.trim().is_empty() {
            writeln!(f, "{}", package.description.trim())?;
        }
        writeln!(f)?;
        writeln!(f, "Version:     {version}")?;
        if !package.author.is_empty() {
            writeln!(f, "Author:      {}", package.author)?;
        }
        if let Some(license) = &package.license {
            writeln!(f, "License:     {license}")?;
        }
        if let Some(category) = &package.category {
            writeln!(f, "Category:    {category}")?;
        }
        if !package.repository.is_empty() {
            writeln!(f, "Repository:  {}", package.repository)?;
        }
        if let Some(homepage) = package.homepage.as_deref().filter(|h| !h.is_empty()) {
            writeln!(f, "Homepage:    {homepage}")?;
        }
        if !package.keywords.is_empty() {
            writeln!(f, "Keywords:    {}", package.keywords.join(", "))?;
        }
        write!(f, "{}", DisplayStats(package))?;

        if !package.versions.is_empty() {
            writeln!(f)?;
            writeln!(f, "Versions:")?;
            for release in &package.versions {
                match &release.release_date {
                    Some(date) => writeln!(f, "  {}  ({date})", release.version)?,
                    None => writeln!(f, "  {}", release.version)?,
                }
            }
        }
        Ok(())
    }
}

/// Download statistics of a package.
pub struct DisplayStats<'a>(pub &'a Package);

impl Display for DisplayStats<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.0.stats;
        writeln!(f, "Downloads:   {}", stats.downloads)?;
        writeln!(f, "Stars:       {}", stats.stars)?;
        writeln!(f, "Updated:     {}", format_updated(stats))?;
        writeln!(f, "Install:     rstar install {}", self.0.name)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn package(value: serde_json::Value) -> Package {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn counts_are_abbreviated() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1.0k");
        assert_eq!(format_count(12_345), "12.3k");
        assert_eq!(format_count(3_400_000), "3.4M");
    }

    #[test]
    fn listing_aligns_names() {
        let page = CatalogPage {
            items: vec![
                package(json!({"name": "orm", "description": "Object mapper",
                    "stats": {"downloads": 1500, "stars": 12}})),
                package(json!({"name": "http-client"})),
            ],
            total: 2,
            problem: None,
        };

        assert_eq!(
            DisplayListing { page: &page }.to_string(),
            indoc! {"
                orm          Object mapper  (⬇ 1.5k, ★ 12)
                http-client  <no description provided>  (⬇ 0, ★ 0)"}
        );
    }

    #[test]
    fn summary_mentions_query_and_filters() {
        let filters = FilterState {
            query: Some("json".to_string()),
            category: Some(rads_catalog::Category::Utils),
            sort: rads_catalog::SortKey::Stars,
            ..Default::default()
        };
        let page = CatalogPage {
            total: 4,
            ..Default::default()
        };
        assert_eq!(
            listing_summary(&filters, &page),
            "4 packages found for 'json' (2 filters active)"
        );
    }

    #[test]
    fn stats_show_date_and_install_hint() {
        let pkg = package(json!({
            "name": "sqlite-rads",
            "stats": {"downloads": 42, "stars": 7, "lastUpdated": "2024-03-09T08:00:00Z"},
        }));
        assert_eq!(DisplayStats(&pkg).to_string(), indoc! {"
            Downloads:   42
            Stars:       7
            Updated:     2024-03-09
            Install:     rstar install sqlite-rads
        "});
    }

    #[test]
    fn unparseable_update_time_is_shown_verbatim() {
        let stats = PackageStats {
            last_updated: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert_eq!(format_updated(&stats), "yesterday");
        assert_eq!(format_updated(&PackageStats::default()), "unknown");
    }
}
