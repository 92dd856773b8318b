use url::Url;

use crate::RavenDbError;

/// One query target among a cluster: base address plus database name.
/// Commands never mutate a node; the transport owns node selection.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ServerNode {
    pub url: Url,
    pub database: String,
}

impl ServerNode {
    pub fn new(url: Url, database: impl Into<String>) -> Self {
        Self {
            url,
            database: database.into(),
        }
    }

    /// Builds `{url}/databases/{database}/<segments>`, percent-encoding every
    /// segment. All database-scoped commands route through here so encoding
    /// rules stay in one place.
    pub fn database_url(&self, segments: &[&str]) -> Result<Url, RavenDbError> {
        let mut url = self.url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                RavenDbError::InvalidArgument(format!(
                    "server url `{}` cannot be used as a base",
                    self.url
                ))
            })?
            .pop_if_empty()
            .extend(
                ["databases", self.database.as_str()]
                    .into_iter()
                    .chain(segments.iter().copied()),
            );
        Ok(url)
    }

    /// Builds `{url}/admin/databases` for the server-wide admin endpoints.
    pub fn admin_databases_url(&self) -> Result<Url, RavenDbError> {
        let mut url = self.url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                RavenDbError::InvalidArgument(format!(
                    "server url `{}` cannot be used as a base",
                    self.url
                ))
            })?
            .pop_if_empty()
            .extend(["admin", "databases"]);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::ServerNode;

    fn node() -> ServerNode {
        ServerNode::new(
            Url::parse("http://localhost:8080").unwrap(),
            "north wind".to_string(),
        )
    }

    #[test]
    fn database_url_percent_encodes_database_name_and_segments() {
        // Act
        let url = node().database_url(&["queries", "Orders/By Company"]).unwrap();

        // Assert
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/databases/north%20wind/queries/Orders%2FBy%20Company"
        );
    }

    #[test]
    fn admin_databases_url_ignores_database_name() {
        let url = node().admin_databases_url().unwrap();

        assert_eq!(url.as_str(), "http://localhost:8080/admin/databases");
    }
}
