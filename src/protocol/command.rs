// Command sentence builder.

/// OR-combinator word: pops the two previous query results and pushes their disjunction.
pub const QUERY_OR: &str = "?#|";

/// One command sentence: a control word (resource path), `=key=value` attributes and
/// `?key=value` query conditions. Multiple conditions are OR-ed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    path: String,
    attributes: Vec<String>,
    queries: Vec<String>,
}

impl Command {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            attributes: Vec::new(),
            queries: Vec::new(),
        }
    }

    /// Adds `=key=value`.
    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.attributes.push(format!("={key}={value}"));
        self
    }

    /// Adds a bare `=key` attribute (e.g. `=stats`).
    pub fn flag(mut self, key: &str) -> Self {
        self.attributes.push(format!("={key}"));
        self
    }

    /// Adds a `?key=value` condition.
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.queries.push(format!("?{key}={value}"));
        self
    }

    /// The words of the sentence, without the terminating empty word.
    /// `?#|` follows every query condition from the second one onward:
    /// `?name=a ?name=b ?#| ?name=c ?#|`.
    pub fn words(&self) -> Vec<String> {
        let mut words = Vec::with_capacity(1 + self.attributes.len() + self.queries.len() * 2);
        words.push(self.path.clone());
        words.extend(self.attributes.iter().cloned());
        for (i, q) in self.queries.iter().enumerate() {
            words.push(q.clone());
            if i >= 1 {
                words.push(QUERY_OR.to_string());
            }
        }
        words
    }
}

/// `/interface/print` restricted to live counters of the named interfaces.
/// An empty `names` list selects every interface.
pub fn interface_stats(names: &[String]) -> Command {
    names.iter().fold(
        Command::new("/interface/print")
            .flag("stats")
            .attr(".proplist", "name,rx-byte,tx-byte"),
        |cmd, name| cmd.query("name", name),
    )
}
