use std::collections::HashSet;

/// Fixed set of channels allowed to have history retained and summarized.
///
/// The default policy is empty and therefore denies every channel.
#[derive(Debug, Clone, Default)]
pub struct ChannelAccessPolicy {
    allowed: HashSet<i64>,
}

impl ChannelAccessPolicy {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            allowed: ids.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn is_allowed(&self, channel_id: i64) -> bool {
        self.allowed.contains(&channel_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}
