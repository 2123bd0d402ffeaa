use crate::error::Error;

pub const PD_ENDPOINTS_ENV: &str = "KV_DOCSTORE_PD_ENDPOINTS";
pub const COLLECTION_ENV: &str = "KV_DOCSTORE_COLLECTION";
pub const DEFAULT_COLLECTION: &str = "comment";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub pd_endpoints: Vec<String>,
    /// Collection served by the action dispatcher.
    pub collection: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            pd_endpoints: Vec::new(),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

impl StoreOptions {
    pub fn new(pd_endpoints: Vec<String>) -> Self {
        Self {
            pd_endpoints,
            ..Default::default()
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let pd_endpoints = lookup(PD_ENDPOINTS_ENV)
            .map(|raw| parse_endpoints(&raw))
            .unwrap_or_default();
        if pd_endpoints.is_empty() {
            return Err(Error::NotConfigured(format!("{} is not set", PD_ENDPOINTS_ENV)));
        }

        let mut options = Self::new(pd_endpoints);
        if let Some(collection) = lookup(COLLECTION_ENV).filter(|c| !c.trim().is_empty()) {
            options.collection = collection.trim().to_string();
        }
        Ok(options)
    }
}

fn parse_endpoints(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|endpoint| !endpoint.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn missing_endpoints_is_not_configured() {
        assert!(matches!(
            StoreOptions::from_lookup(lookup(&[])),
            Err(Error::NotConfigured(_))
        ));
        assert!(matches!(
            StoreOptions::from_lookup(lookup(&[(PD_ENDPOINTS_ENV, " , ")])),
            Err(Error::NotConfigured(_))
        ));
    }

    #[test]
    fn parses_endpoint_list() {
        let options = StoreOptions::from_lookup(lookup(&[(
            PD_ENDPOINTS_ENV,
            "10.0.0.1:2379, 10.0.0.2:2379,",
        )]))
        .unwrap();
        assert_eq!(options.pd_endpoints, vec!["10.0.0.1:2379", "10.0.0.2:2379"]);
        assert_eq!(options.collection, DEFAULT_COLLECTION);
    }

    #[test]
    fn collection_override() {
        let options = StoreOptions::from_lookup(lookup(&[
            (PD_ENDPOINTS_ENV, "pd:2379"),
            (COLLECTION_ENV, "guestbook"),
        ]))
        .unwrap();
        assert_eq!(options.collection, "guestbook");
        assert_eq!(
            StoreOptions::new(vec![]).with_collection("x").collection,
            "x"
        );
    }
}
