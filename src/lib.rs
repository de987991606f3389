// Library root
// -----------
// The binary (`main.rs`) drives these modules from an interactive menu;
// other programs can use `api::ApiClient` directly.
//
// Module responsibilities:
// - `api`: the request and upload dispatchers.
// - `config`: base URL lookup from the environment.
// - `session`: session cookie lookup and the on-disk cookie file.
// - `error`: `DispatchError` and the caller-owned `ErrorSlot`.
// - `logging`: tracing subscriber setup for the binary.
// - `ui`: terminal flows that call into `api`.
pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod ui;
