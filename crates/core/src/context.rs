//! Request-time description of who is being recommended to, and from where.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;
use crate::errors::DomainError;

/// Who the recommendation is for: a known user or an anonymous session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    User(String),
    Session(String),
}

impl Subject {
    pub fn id(&self) -> &str {
        match self {
            Subject::User(id) | Subject::Session(id) => id,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Subject::Session(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Home,
    Product,
    Category,
    Cart,
    Checkout,
    Search,
    Other,
}

impl PageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::Home => "home",
            PageType::Product => "product",
            PageType::Category => "category",
            PageType::Cart => "cart",
            PageType::Checkout => "checkout",
            PageType::Search => "search",
            PageType::Other => "other",
        }
    }
}

impl std::str::FromStr for PageType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "home" => Ok(Self::Home),
            "product" => Ok(Self::Product),
            "category" => Ok(Self::Category),
            "cart" => Ok(Self::Cart),
            "checkout" => Ok(Self::Checkout),
            "search" => Ok(Self::Search),
            "other" => Ok(Self::Other),
            other => Err(DomainError::InvalidContext(format!("unknown page type `{other}`"))),
        }
    }
}

/// Immutable value describing a single recommendation request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub subject: Subject,
    pub anchor_product: Option<ProductId>,
    pub page_type: PageType,
    pub locale: String,
    pub requested_at: DateTime<Utc>,
}

impl Context {
    pub fn new(subject: Subject, page_type: PageType, locale: impl Into<String>) -> Self {
        Self { subject, anchor_product: None, page_type, locale: locale.into(), requested_at: Utc::now() }
    }

    pub fn with_anchor(mut self, product_id: ProductId) -> Self {
        self.anchor_product = Some(product_id);
        self
    }

    pub fn with_requested_at(mut self, at: DateTime<Utc>) -> Self {
        self.requested_at = at;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.subject.id().trim().is_empty() {
            return Err(DomainError::InvalidContext("subject id must not be blank".to_owned()));
        }
        if self.locale.trim().is_empty() {
            return Err(DomainError::InvalidContext("locale must not be blank".to_owned()));
        }
        if let Some(anchor) = &self.anchor_product {
            if anchor.0.trim().is_empty() {
                return Err(DomainError::InvalidContext(
                    "anchor product id must not be blank".to_owned(),
                ));
            }
        }
        Ok(())
    }

    /// Deterministic signature used in cache keys. The timestamp is
    /// deliberately excluded: two requests from the same subject on the
    /// same page must hit the same cache entry within the TTL.
    pub fn signature(&self) -> String {
        let subject = match &self.subject {
            Subject::User(id) => format!("user:{id}"),
            Subject::Session(id) => format!("session:{id}"),
        };
        let anchor = self.anchor_product.as_ref().map(|p| p.0.as_str()).unwrap_or("-");
        format!("{subject}|anchor:{anchor}|page:{}|locale:{}", self.page_type.as_str(), self.locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_stable_across_timestamps() {
        let a = Context::new(Subject::User("u-1".into()), PageType::Product, "en-US")
            .with_anchor(ProductId("p-9".into()));
        let b = a.clone().with_requested_at(a.requested_at + chrono::Duration::hours(3));

        assert_eq!(a.signature(), b.signature());
        assert_eq!(a.signature(), "user:u-1|anchor:p-9|page:product|locale:en-US");
    }

    #[test]
    fn anonymous_session_signature_differs_from_user() {
        let user = Context::new(Subject::User("x".into()), PageType::Home, "en");
        let session = Context::new(Subject::Session("x".into()), PageType::Home, "en");

        assert_ne!(user.signature(), session.signature());
        assert!(session.subject.is_anonymous());
    }

    #[test]
    fn blank_subject_fails_validation() {
        let context = Context::new(Subject::Session("  ".into()), PageType::Home, "en");
        assert!(matches!(context.validate(), Err(DomainError::InvalidContext(_))));
    }

    #[test]
    fn blank_locale_fails_validation() {
        let context = Context::new(Subject::User("u".into()), PageType::Home, "");
        assert!(matches!(context.validate(), Err(DomainError::InvalidContext(_))));
    }
}
