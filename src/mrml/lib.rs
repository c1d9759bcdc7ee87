//! # MRML Architecture
//!
//! `mrml` is the scene-graph core of a medical-imaging application: a scene
//! owning typed nodes (volumes, display properties, transforms, colour
//! tables, storage), a central table of references between them, and
//! synchronous change notifications that views subscribe to.
//!
//! Rendering, image processing and user interfaces are outside the crate.
//! They are the *observers*: they subscribe to scene and node events and
//! pull whatever state they need from the nodes.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (cli/, wired by main.rs)                               │
//! │  - Parses arguments, prints, owns exit codes                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Commands (commands/*.rs)                                   │
//! │  - inspect / check / normalize over a scene file            │
//! │  - Return CmdResult, never print                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Scene (scene/)                                             │
//! │  - Node collection, id allocation, batching                 │
//! │  - Import / restore / connect, MRML file I/O                │
//! │  - Undo / redo history                                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Nodes, ReferenceTable, ObserverLedger                      │
//! │  - node/, references.rs, observer.rs, event.rs              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Threading
//!
//! Everything is single-threaded. Nodes and scenes use `Rc`, `RefCell` and
//! `Cell`; none of the public types are `Send`. Events are delivered on the
//! caller's stack before the mutating call returns.
//!
//! ## Example
//!
//! ```
//! use mrml::node::{Node, ScalarVolume, VolumeDisplay};
//! use mrml::scene::Scene;
//!
//! let scene = Scene::default();
//! let volume = scene.add_node(&Node::with(ScalarVolume::default())).unwrap();
//! let display = scene.add_node(&Node::with(VolumeDisplay::default())).unwrap();
//! volume.add_reference("display", display.require_id().unwrap()).unwrap();
//!
//! assert_eq!(volume.require_id().unwrap(), "vtkMRMLScalarVolumeNode1");
//! assert_eq!(scene.referencing_nodes("vtkMRMLScalarVolumeDisplayNode1").len(), 1);
//! ```
//!
//! ## Module Overview
//!
//! - [`scene`]: The scene, batching, bulk loads, file I/O and undo
//! - [`node`]: Node handles, the variant trait and built-in node types
//! - [`references`]: Forward/inverse reference bookkeeping
//! - [`observer`]: Subscription ledgers and event delivery
//! - [`event`]: Event kinds and payloads
//! - [`registry`]: Class/tag to node factory lookup
//! - [`ids`]: Identifiers and their allocation
//! - [`commands`]: Scene-file commands used by the binary
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod commands;
pub mod config;
pub mod error;
pub mod event;
pub mod ids;
pub mod node;
pub mod observer;
pub mod references;
pub mod registry;
pub mod scene;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{MrmlError, Result};
pub use ids::NodeId;
pub use node::{Node, NodeRef};
pub use scene::Scene;
