use std::time::Duration;

/// Default operator joining query clauses. The server assumes `OR`; commands
/// only put the operator on the wire when it deviates from that.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum QueryOperator {
    #[default]
    Or,
    And,
}

impl QueryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryOperator::Or => "OR",
            QueryOperator::And => "AND",
        }
    }
}

/// Everything required to run a query against a named index.
#[derive(Debug, Clone)]
pub struct IndexQuery {
    query: String,
    page_size: usize,
    default_operator: QueryOperator,
    sort_hints: Vec<String>,
    sort_fields: Vec<String>,
    fetch: Vec<String>,
    wait_for_non_stale_results_timeout: Option<Duration>,
}

impl IndexQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page_size: 128,
            default_operator: QueryOperator::default(),
            sort_hints: Vec::new(),
            sort_fields: Vec::new(),
            fetch: Vec::new(),
            wait_for_non_stale_results_timeout: None,
        }
    }
}

// Mutators
impl IndexQuery {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_default_operator(mut self, operator: QueryOperator) -> Self {
        self.default_operator = operator;
        self
    }

    /// Raw sort hints in `key=value` form, passed through to the query
    /// string as-is.
    pub fn with_sort_hints(mut self, hints: Vec<String>) -> Self {
        self.sort_hints = hints;
        self
    }

    pub fn with_sort_fields(mut self, fields: Vec<String>) -> Self {
        self.sort_fields = fields;
        self
    }

    pub fn with_fetch(mut self, fields: Vec<String>) -> Self {
        self.fetch = fields;
        self
    }

    pub fn with_wait_for_non_stale_results_timeout(mut self, timeout: Duration) -> Self {
        self.wait_for_non_stale_results_timeout = Some(timeout);
        self
    }
}

// Getters
impl IndexQuery {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn default_operator(&self) -> QueryOperator {
        self.default_operator
    }

    pub fn sort_hints(&self) -> &[String] {
        &self.sort_hints
    }

    pub fn sort_fields(&self) -> &[String] {
        &self.sort_fields
    }

    pub fn fetch(&self) -> &[String] {
        &self.fetch
    }

    pub fn wait_for_non_stale_results_timeout(&self) -> Option<Duration> {
        self.wait_for_non_stale_results_timeout
    }
}

/// Options for set-based operations driven by an index query, such as
/// patch-by-index and delete-by-index.
#[derive(Debug, Clone)]
pub struct QueryOperationOptions {
    allow_stale: bool,
    stale_timeout: Option<Duration>,
    max_ops_per_sec: Option<u32>,
    retrieve_details: bool,
}

impl Default for QueryOperationOptions {
    fn default() -> Self {
        Self {
            allow_stale: true,
            stale_timeout: None,
            max_ops_per_sec: None,
            retrieve_details: false,
        }
    }
}

// Mutators
impl QueryOperationOptions {
    pub fn with_allow_stale(mut self, allow_stale: bool) -> Self {
        self.allow_stale = allow_stale;
        self
    }

    pub fn with_stale_timeout(mut self, timeout: Duration) -> Self {
        self.stale_timeout = Some(timeout);
        self
    }

    pub fn with_max_ops_per_sec(mut self, max: u32) -> Self {
        self.max_ops_per_sec = Some(max);
        self
    }

    pub fn with_retrieve_details(mut self, retrieve_details: bool) -> Self {
        self.retrieve_details = retrieve_details;
        self
    }
}

// Getters
impl QueryOperationOptions {
    pub fn allow_stale(&self) -> bool {
        self.allow_stale
    }

    pub fn stale_timeout(&self) -> Option<Duration> {
        self.stale_timeout
    }

    pub fn max_ops_per_sec(&self) -> Option<u32> {
        self.max_ops_per_sec
    }

    pub fn retrieve_details(&self) -> bool {
        self.retrieve_details
    }
}
