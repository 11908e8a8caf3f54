//! # edufund-supabase
//!
//! Supabase integration for the EduFund Connect donation flow.
//!
//! ## Endpoints used
//!
//! - **PostgREST**: `projects` (read), `donations` (insert, status patch)
//! - **RPC**: `increment_project_funds`, `update_escrow_on_donation`
//! - **Auth**: `GET /auth/v1/user` to resolve donor access tokens
//!
//! ## Usage
//!
//! ```rust,ignore
//! use edufund_supabase::{SupabaseClient, SupabaseConfig};
//!
//! let client = Arc::new(SupabaseClient::new(SupabaseConfig::new(
//!     "https://abcd.supabase.co",
//!     "service-role-key",
//! ))?);
//! let store: Arc<dyn DonationStore> = client.clone();
//! let auth: Arc<dyn Authenticator> = client;
//! ```

pub mod supabase;

pub use supabase::{SupabaseClient, SupabaseConfig};

// Re-export core seams for convenience
pub use edufund_core::{Authenticator, DonationStore, FundError, Result};
