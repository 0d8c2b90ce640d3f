//! Query options for record and monitor listing endpoints.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DbaFormat {
    #[default]
    Default = 0,
    CodeOnly = 1,
    CodeAndName = 2,
}

/// Filter, ordering, projection, and paging for a GET listing.
///
/// Only non-default values are sent, so `Query::default()` produces an
/// empty query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub filter: Option<String>,
    pub order_by: Vec<String>,
    pub attributes: Vec<String>,
    pub dba_format: DbaFormat,
    pub counts_only: bool,
    pub page_number: u32,
    pub page_size: u32,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            filter: None,
            order_by: Vec::new(),
            attributes: Vec::new(),
            dba_format: DbaFormat::Default,
            counts_only: false,
            page_number: 1,
            page_size: 50,
        }
    }
}

impl Query {
    pub fn filter(expr: impl Into<String>) -> Self {
        Self {
            filter: Some(expr.into()),
            ..Self::default()
        }
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by.push(column.into());
        self
    }

    /// Query pairs in the order the platform documents them.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(filter) = self.filter.as_ref().filter(|f| !f.is_empty()) {
            pairs.push(("filter", filter.clone()));
        }
        if !self.order_by.is_empty() {
            pairs.push(("orderby", self.order_by.join(",")));
        }
        if !self.attributes.is_empty() {
            pairs.push(("attributes", self.attributes.join(",")));
        }
        if self.counts_only {
            pairs.push(("countsonly", "true".to_string()));
        }
        if self.dba_format != DbaFormat::Default {
            pairs.push(("dbaformat", (self.dba_format as u8).to_string()));
        }
        if self.page_number != 1 {
            pairs.push(("pagenumber", self.page_number.to_string()));
        }
        if self.page_size != 50 {
            pairs.push(("pagesize", self.page_size.to_string()));
        }
        pairs
    }

    /// Filter on a record code, as used to fetch a single record.
    pub fn by_code(code: &str) -> Self {
        Self::filter(format!("[Code] eq '{}'", escape_literal(code)))
    }
}

/// Escape a value for use inside a single-quoted filter literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}
