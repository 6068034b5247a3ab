//! InventoryFlow fulfillment library
//!
//! Stock-aware reconciliation for goods issue notes (GIN, issued against a
//! sales order) and goods receive notes (GRN, received against a purchase
//! order). The [`services`] module holds the pure reconciliation steps,
//! [`draft`] the state machine a document moves through while it is being
//! authored, and [`session`] wires both to the order-management API.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod client;
pub mod config;
pub mod draft;
pub mod errors;
pub mod models;
pub mod services;
pub mod session;

pub use client::{HttpOrderManagementClient, OrderManagementApi};
pub use draft::{DraftEvent, DraftMode, DraftStatus, FulfillmentDraft};
pub use errors::ServiceError;
pub use models::{FulfillmentKind, ItemId};
pub use services::{FulfillmentReconciler, StockSnapshotIndex};
pub use session::FulfillmentSession;
