use crate::error::Result;
use crate::RecordStore;

use async_trait::async_trait;

/// A function adapter for implementing the RecordStore trait
///
/// Lets a synchronous backend (a database handle, a cache) act as a record
/// store without a dedicated type.
pub struct RecordStoreFn<G, P>
where
    G: Fn(&str) -> Result<Option<String>> + Send + Sync,
    P: Fn(&str, &str) -> Result<()> + Send + Sync,
{
    /// The get function
    get: G,
    /// The put function
    put: P,
}

impl<G, P> RecordStoreFn<G, P>
where
    G: Fn(&str) -> Result<Option<String>> + Send + Sync,
    P: Fn(&str, &str) -> Result<()> + Send + Sync,
{
    /// Creates a new RecordStoreFn with the given functions
    pub fn new(get: G, put: P) -> Self {
        Self { get, put }
    }
}

impl<G, P> std::fmt::Debug for RecordStoreFn<G, P>
where
    G: Fn(&str) -> Result<Option<String>> + Send + Sync,
    P: Fn(&str, &str) -> Result<()> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStoreFn").finish_non_exhaustive()
    }
}

#[async_trait]
impl<G, P> RecordStore for RecordStoreFn<G, P>
where
    G: Fn(&str) -> Result<Option<String>> + Send + Sync,
    P: Fn(&str, &str) -> Result<()> + Send + Sync,
{
    async fn get(&self, user_id: &str) -> Result<Option<String>> {
        (self.get)(user_id)
    }

    async fn put(&self, user_id: &str, blob: &str) -> Result<()> {
        (self.put)(user_id, blob)
    }
}
