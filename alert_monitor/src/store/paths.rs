/// Derives the per-alert store keys from the alert name.
///
/// Snapshots, query mirrors and temporary queries live in separate
/// subdirectories, so no alert name can produce another kind's key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlertPaths {
    dir: String,
}

impl Default for AlertPaths {
    fn default() -> Self {
        Self::new("alerts")
    }
}

impl AlertPaths {
    pub fn new(dir: impl Into<String>) -> Self {
        let dir: String = dir.into();
        Self {
            dir: dir.trim_end_matches('/').to_string(),
        }
    }

    /// Last successful result snapshot.
    pub fn snapshot(&self, name: &str) -> String {
        format!("{}/snapshots/{name}.json", self.dir)
    }

    /// Mirror of the alert's query, used to detect query edits.
    pub fn mirror(&self, name: &str) -> String {
        format!("{}/queries/{name}.json", self.dir)
    }

    /// A fresh, collision-free key for one detail lookup's narrowed query.
    pub fn temp_query(&self, name: &str) -> String {
        let tag = uuid::Uuid::new_v4().simple().to_string();
        format!("{}/tmp/{name}_{}_query_tmp.json", self.dir, &tag[..8])
    }

    /// Keys left behind by an alert once it has been polled.
    pub fn residual(&self, name: &str) -> [String; 2] {
        [self.snapshot(name), self.mirror(name)]
    }
}
