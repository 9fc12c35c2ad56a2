//! Validation of the publish form and submission to the registry.

use rads_catalog::types::{Category, License, PublishPackage, PublishResult, Session};
use rads_catalog::{CatalogClientError, ClientTrait};
use thiserror::Error;
use tracing::{debug, instrument};

/// Raw publish input as entered by the user.
///
/// `keywords` is the comma separated string from the form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishForm {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub version: String,
    pub repository: String,
    pub homepage: String,
    pub category: Option<Category>,
    pub license: Option<License>,
    pub keywords: String,
    pub readme: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("you must be logged in to publish packages")]
    NotLoggedIn,
    #[error("'{0}' is required")]
    MissingField(&'static str),
    #[error("package name '{0}' may only contain lowercase letters, digits and '-'")]
    InvalidName(String),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Catalog(#[from] CatalogClientError),
    #[error("the registry did not accept the package")]
    NotAccepted,
}

impl PublishError {
    /// The single message shown to the user for a failed publish.
    pub fn user_message(&self) -> String {
        match self {
            PublishError::Validation(err) => err.to_string(),
            PublishError::Catalog(err) => err.user_message(),
            PublishError::NotAccepted => self.to_string(),
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn required(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

impl PublishForm {
    /// Validate the form and build the package sent to the registry.
    ///
    /// The author is always the login of the session's user.
    pub fn into_package(self, session: &Session) -> Result<PublishPackage, ValidationError> {
        let author = match (&session.token, &session.user) {
            (Some(_), Some(user)) => user.login.clone(),
            _ => return Err(ValidationError::NotLoggedIn),
        };

        required(&self.name, "name")?;
        let name = self.name.trim().to_string();
        if !is_valid_name(&name) {
            return Err(ValidationError::InvalidName(name));
        }
        required(&self.description, "description")?;
        required(&self.version, "version")?;
        required(&self.repository, "repository")?;
        required(&self.readme, "readme")?;

        let display_name = match self.display_name.trim() {
            "" => name.clone(),
            display_name => display_name.to_string(),
        };
        let keywords = self
            .keywords
            .split(',')
            .map(str::trim)
            .filter(|keyword| !keyword.is_empty())
            .map(String::from)
            .collect();

        Ok(PublishPackage {
            name,
            display_name,
            description: self.description.trim().to_string(),
            version: self.version,
            author,
            repository: self.repository.trim().to_string(),
            homepage: self.homepage.trim().to_string(),
            category: self.category,
            license: self.license.unwrap_or(License::Mit),
            keywords,
            readme: self.readme,
        })
    }
}

/// Validate and publish a package with the session's credential.
///
/// Nothing is sent if validation fails.
#[instrument(skip_all, fields(name = %form.name))]
pub async fn publish_package(
    client: &impl ClientTrait,
    form: PublishForm,
    session: &Session,
) -> Result<PublishResult, PublishError> {
    let package = form.into_package(session)?;
    let Some(token) = session.token.as_ref() else {
        return Err(ValidationError::NotLoggedIn.into());
    };

    let result = client.publish(&package, token).await?;
    if !result.success {
        return Err(PublishError::NotAccepted);
    }
    debug!(name = %package.name, version = %package.version, "package published");
    Ok(result)
}
