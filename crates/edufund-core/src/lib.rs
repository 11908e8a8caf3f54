//! # edufund-core
//!
//! Domain model and storage seams for the EduFund Connect donation flow.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Donation flow                          │
//! │  ┌─────────────┐  ┌──────────────────┐  ┌────────────────┐  │
//! │  │ FeeSchedule │  │  DonationStore   │  │ Authenticator  │  │
//! │  │ (cents)     │  │  (projects,      │  │ (bearer token  │  │
//! │  │             │  │   donations,     │  │  → Donor)      │  │
//! │  │             │  │   escrow)        │  │                │  │
//! │  └─────────────┘  └──────────────────┘  └────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store and authenticator traits let the hosted database be swapped
//! for the in-memory implementations in development and tests.

pub mod auth;
pub mod error;
pub mod fees;
pub mod memory;
pub mod model;
pub mod store;

pub use auth::{bearer_token, Authenticator};
pub use error::{FundError, Result};
pub use fees::{
    validate_amount, FeeBreakdown, FeeSchedule, MAX_CHARGE_CENTS, MAX_DONATION, MIN_DONATION,
};
pub use memory::{MemoryAuthenticator, MemoryDonationStore};
pub use model::{
    Donation, DonationStatus, Donor, Escrow, EscrowStatus, NewDonation, Project, ProjectStatus,
};
pub use store::{DonationStore, FollowUp, FollowUpFailure, Settlement};
