//! `DeviceMaster` — the process-global topic registry.
//!
//! Grounded in the teacher's pattern of process-wide, lazily-initialized
//! state (`once_cell::sync::Lazy`), generalized here from an immutable
//! constant to a registry guarded by its own lock (spec §4.1, §5: "one
//! mutex for the DeviceMaster registry... registry lock held only across
//! map lookup/insert").

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::info;

use crate::node::DeviceNode;
use crate::topic::TopicMeta;

type NodeKey = (usize, u16);

#[derive(Default)]
struct Registry {
    nodes: HashMap<NodeKey, Arc<DeviceNode>>,
    /// Instances reserved by `open_next_free_publisher` before their
    /// first publish lands, so a second concurrent caller does not pick
    /// the same instance (spec §4.1).
    reserved: std::collections::HashSet<NodeKey>,
}

/// Process-wide `(topic, instance) -> DeviceNode` map (spec §3
/// "DeviceMaster"). Nodes live until process shutdown; there is no
/// user-facing explicit teardown call (spec §9 "Global registry"), but
/// `DeviceMaster::shutdown` exists for tests and for embedders that
/// need a clean process-internal reset between runs.
pub struct DeviceMaster {
    inner: Mutex<Registry>,
}

impl DeviceMaster {
    fn new() -> Self {
        Self { inner: Mutex::new(Registry::default()) }
    }

    /// Looks up or lazily creates the node for `(meta, instance)`. If
    /// the node already exists, `requested_queue_size` is ignored here;
    /// growth happens at publish time (spec §4.1, §4.4).
    pub fn open_or_create(
        &self,
        meta: &'static TopicMeta,
        instance: u16,
        requested_queue_size: usize
    ) -> Arc<DeviceNode> {
        let key = (meta.id(), instance);
        let mut registry = self.inner.lock();
        if let Some(node) = registry.nodes.get(&key) {
            return node.clone();
        }
        let node = Arc::new(DeviceNode::new(meta, instance, requested_queue_size));
        registry.nodes.insert(key, node.clone());
        node
    }

    /// Scans instances starting at 0 for the first one that is either
    /// absent or present-but-never-advertised-or-reserved, reserves it,
    /// and returns it along with its index (spec §4.1
    /// `open_next_free_publisher`).
    pub fn open_next_free_publisher(
        &self,
        meta: &'static TopicMeta,
        requested_queue_size: usize
    ) -> (Arc<DeviceNode>, u16) {
        let mut registry = self.inner.lock();
        let mut instance = crate::constants::FIRST_INSTANCE;
        loop {
            let key = (meta.id(), instance);
            let taken = match registry.nodes.get(&key) {
                Some(node) => node.is_advertised() || registry.reserved.contains(&key),
                None => registry.reserved.contains(&key),
            };
            if !taken {
                registry.reserved.insert(key);
                let node = registry.nodes
                    .entry(key)
                    .or_insert_with(|| Arc::new(DeviceNode::new(meta, instance, requested_queue_size)))
                    .clone();
                return (node, instance);
            }
            instance = instance.checked_add(1).expect("topic instance space exhausted");
        }
    }

    /// Looks up an existing node without creating one.
    pub fn lookup(&self, meta: &'static TopicMeta, instance: u16) -> Option<Arc<DeviceNode>> {
        self.inner.lock().nodes.get(&(meta.id(), instance)).cloned()
    }

    /// Drops every node (first emptying each node's callback list), for
    /// use in tests that need a clean registry between scenarios. Real
    /// process shutdown just lets the registry's `Arc`s drop normally.
    pub fn shutdown(&self) {
        let mut registry = self.inner.lock();
        for node in registry.nodes.values() {
            node.clear_callbacks();
        }
        registry.nodes.clear();
        registry.reserved.clear();
        info!("registry shut down");
    }
}

static REGISTRY: Lazy<DeviceMaster> = Lazy::new(DeviceMaster::new);

/// The process-global registry singleton.
pub fn registry() -> &'static DeviceMaster {
    &REGISTRY
}
