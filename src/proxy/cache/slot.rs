use bytes::Bytes;

/// One fixed position in the cache. An invalid slot's tag and payload carry
/// no meaning; they are only replaced, never cleared.
#[derive(Debug, Default, Clone)]
pub(super) struct CacheSlot {
    pub valid: bool,
    pub tag: String,
    pub payload: Bytes,
    pub usage: u64,
}

impl CacheSlot {
    pub(super) fn matches(&self, tag: &str) -> bool {
        self.valid && self.tag == tag
    }

    pub(super) fn touch(&mut self) {
        self.usage = self.usage.saturating_add(1);
    }

    pub(super) fn fill(&mut self, tag: &str, payload: Bytes) {
        self.valid = true;
        self.tag.clear();
        self.tag.push_str(tag);
        self.payload = payload;
        self.usage = 0;
    }
}
