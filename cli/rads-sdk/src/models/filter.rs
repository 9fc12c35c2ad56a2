//! Composition of user filter input into a canonical [FilterState].
//!
//! User interactions are expressed as [FilterPatch]es and merged into the
//! current state. A patch only names the fields it changes.

pub use rads_catalog::types::{Category, FilterState, License, SortKey};

/// The change requested for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchValue<T> {
    /// Override the field.
    Set(T),
    /// Select-style toggle: clears the field if it already holds the value,
    /// sets it otherwise.
    Toggle(T),
    /// Reset the field to "unset" (or the default sort order).
    Clear,
}

impl<T: PartialEq> PatchValue<T> {
    fn resolve(self, current: Option<T>) -> Option<T> {
        match self {
            PatchValue::Set(value) => Some(value),
            PatchValue::Toggle(value) if current.as_ref() == Some(&value) => None,
            PatchValue::Toggle(value) => Some(value),
            PatchValue::Clear => None,
        }
    }
}

/// A partial update of a [FilterState].
///
/// Fields left as `None` are carried over unchanged by [merge].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub query: Option<PatchValue<String>>,
    pub category: Option<PatchValue<Category>>,
    pub license: Option<PatchValue<License>>,
    pub sort: Option<PatchValue<SortKey>>,
}

impl FilterPatch {
    pub fn query(query: impl Into<String>) -> Self {
        FilterPatch {
            query: Some(PatchValue::Set(query.into())),
            ..Default::default()
        }
    }

    pub fn toggle_category(category: Category) -> Self {
        FilterPatch {
            category: Some(PatchValue::Toggle(category)),
            ..Default::default()
        }
    }

    pub fn toggle_license(license: License) -> Self {
        FilterPatch {
            license: Some(PatchValue::Toggle(license)),
            ..Default::default()
        }
    }

    pub fn sort(sort: SortKey) -> Self {
        FilterPatch {
            sort: Some(PatchValue::Set(sort)),
            ..Default::default()
        }
    }

    /// Clears every field ("Clear all").
    pub fn clear_all() -> Self {
        FilterPatch {
            query: Some(PatchValue::Clear),
            category: Some(PatchValue::Clear),
            license: Some(PatchValue::Clear),
            sort: Some(PatchValue::Clear),
        }
    }

    /// Compose two patches, with the fields of `later` taking precedence.
    ///
    /// For patches without toggles, merging the composed patch equals
    /// merging `self` and then `later`.
    pub fn overlay(self, later: FilterPatch) -> FilterPatch {
        FilterPatch {
            query: later.query.or(self.query),
            category: later.category.or(self.category),
            license: later.license.or(self.license),
            sort: later.sort.or(self.sort),
        }
    }
}

/// Merge a patch into the current filters, producing a new canonical state.
pub fn merge(current: &FilterState, patch: &FilterPatch) -> FilterState {
    let mut next = current.clone();

    if let Some(query) = patch.query.clone() {
        next.query = query.resolve(current.query.clone()).and_then(normalize_query);
    }
    if let Some(category) = patch.category.clone() {
        next.category = category.resolve(current.category);
    }
    if let Some(license) = patch.license.clone() {
        next.license = license.resolve(current.license);
    }
    if let Some(sort) = patch.sort.clone() {
        next.sort = sort.resolve(Some(current.sort)).unwrap_or_default();
    }

    next
}

/// Trim a free-text query; blank queries mean "no text filter".
fn normalize_query(query: String) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// How a state change should reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Nothing relevant changed.
    None,
    /// Only the free-text query changed; wait for the quiescence window.
    Debounced,
    /// A select-style control changed; dispatch right away.
    Immediate,
}

impl Trigger {
    pub fn classify(before: &FilterState, after: &FilterState) -> Trigger {
        if before.category != after.category
            || before.license != after.license
            || before.sort != after.sort
        {
            Trigger::Immediate
        } else if before.query != after.query {
            Trigger::Debounced
        } else {
            Trigger::None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    fn patch_value<T: Clone + std::fmt::Debug + 'static>(
        values: &'static [T],
        with_toggle: bool,
    ) -> BoxedStrategy<Option<PatchValue<T>>> {
        let set = proptest::sample::select(values).prop_map(PatchValue::Set);
        let value = if with_toggle {
            prop_oneof![
                set,
                proptest::sample::select(values).prop_map(PatchValue::Toggle),
                Just(PatchValue::Clear),
            ]
            .boxed()
        } else {
            prop_oneof![set, Just(PatchValue::Clear)].boxed()
        };
        proptest::option::of(value).boxed()
    }

    fn query_value() -> impl Strategy<Value = Option<PatchValue<String>>> {
        proptest::option::of(prop_oneof![
            "[ a-z]{0,6}".prop_map(PatchValue::Set),
            Just(PatchValue::Clear),
        ])
    }

    pub(crate) fn any_patch(with_toggle: bool) -> impl Strategy<Value = FilterPatch> {
        (
            query_value(),
            patch_value(Category::ALL, with_toggle),
            patch_value(License::ALL, with_toggle),
            patch_value(SortKey::ALL, false),
        )
            .prop_map(|(query, category, license, sort)| FilterPatch {
                query,
                category,
                license,
                sort,
            })
    }

    pub(crate) fn any_state() -> impl Strategy<Value = FilterState> {
        any_patch(false).prop_map(|patch| merge(&FilterState::default(), &patch))
    }

    proptest! {
        #[test]
        fn merge_is_associative_left_to_right(
            state in any_state(),
            first in any_patch(false),
            second in any_patch(false),
        ) {
            let stepwise = merge(&merge(&state, &first), &second);
            let composed = merge(&state, &first.overlay(second));
            prop_assert_eq!(stepwise, composed);
        }

        #[test]
        fn toggling_twice_restores_state(
            state in any_state(),
            category in proptest::sample::select(Category::ALL),
            license in proptest::sample::select(License::ALL),
        ) {
            // Either nothing or the toggled value is selected beforehand.
            let patch = FilterPatch::toggle_category(category);
            for selected in [None, Some(category)] {
                let start = FilterState { category: selected, ..state.clone() };
                prop_assert_eq!(&merge(&merge(&start, &patch), &patch), &start);
            }

            let patch = FilterPatch::toggle_license(license);
            for selected in [None, Some(license)] {
                let start = FilterState { license: selected, ..state.clone() };
                prop_assert_eq!(&merge(&merge(&start, &patch), &patch), &start);
            }
        }

        #[test]
        fn merged_query_is_never_blank(state in any_state(), patch in any_patch(true)) {
            let merged = merge(&state, &patch);
            if let Some(query) = merged.query {
                prop_assert!(!query.trim().is_empty());
                prop_assert_eq!(query.trim(), query.as_str());
            }
        }
    }

    #[test]
    fn empty_patch_keeps_state() {
        let state = FilterState {
            query: Some("json".to_string()),
            category: Some(Category::Utils),
            license: None,
            sort: SortKey::Stars,
        };
        assert_eq!(merge(&state, &FilterPatch::default()), state);
    }

    #[test]
    fn toggling_a_different_category_replaces_it() {
        let state = merge(
            &FilterState::default(),
            &FilterPatch::toggle_category(Category::Web),
        );
        let state = merge(&state, &FilterPatch::toggle_category(Category::Cli));
        assert_eq!(state.category, Some(Category::Cli));
    }

    #[test]
    fn whitespace_query_clears_text_filter() {
        let state = merge(&FilterState::default(), &FilterPatch::query("orm"));
        let state = merge(&state, &FilterPatch::query("   "));
        assert_eq!(state.query, None);
        assert!(state.to_payload().get("query").is_none());
    }

    #[test]
    fn clearing_sort_restores_relevance() {
        let state = merge(&FilterState::default(), &FilterPatch::sort(SortKey::Updated));
        let state = merge(&state, &FilterPatch {
            sort: Some(PatchValue::Clear),
            ..Default::default()
        });
        assert_eq!(state.sort, SortKey::Relevance);
    }

    #[test]
    fn clear_all_resets_everything() {
        let state = FilterState {
            query: Some("redis".to_string()),
            category: Some(Category::Database),
            license: Some(License::Isc),
            sort: SortKey::Downloads,
        };
        assert_eq!(
            merge(&state, &FilterPatch::clear_all()),
            FilterState::default()
        );
    }

    #[test]
    fn trigger_classification() {
        let base = FilterState::default();
        let typed = merge(&base, &FilterPatch::query("http"));
        let sorted = merge(&typed, &FilterPatch::sort(SortKey::Stars));

        assert_eq!(Trigger::classify(&base, &base), Trigger::None);
        assert_eq!(Trigger::classify(&base, &typed), Trigger::Debounced);
        assert_eq!(Trigger::classify(&typed, &sorted), Trigger::Immediate);
    }
}
