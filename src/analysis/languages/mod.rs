//! Language frontends and the registry that selects them.

mod c;
mod cpp;
mod lower;
mod resolve;

pub use c::CFrontend;
pub use cpp::CppFrontend;

use super::Frontend;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, Ordering};

/// Static storage for C frontend.
static C_FRONTEND: OnceCell<CFrontend> = OnceCell::new();

/// Static storage for C++ frontend.
static CPP_FRONTEND: OnceCell<CppFrontend> = OnceCell::new();

/// Whether frontends have been registered.
static REGISTERED: AtomicBool = AtomicBool::new(false);

/// Register all available language frontends.
///
/// Idempotent; [`get_frontend`] calls it on demand.
pub fn register_frontends() {
    if REGISTERED.swap(true, Ordering::SeqCst) {
        return;
    }

    C_FRONTEND.get_or_init(CFrontend::new);
    CPP_FRONTEND.get_or_init(CppFrontend::new);
}

/// Get a frontend for the given file extension.
pub fn get_frontend(ext: &str) -> Option<&'static dyn Frontend> {
    register_frontends();

    match ext {
        "c" | "h" => C_FRONTEND.get().map(|f| f as &'static dyn Frontend),
        "cpp" | "cc" | "cxx" | "c++" | "hpp" | "hh" | "hxx" => {
            CPP_FRONTEND.get().map(|f| f as &'static dyn Frontend)
        }
        _ => None,
    }
}

/// Get a frontend by language ID, as named by `-x` in compile commands.
pub fn get_frontend_by_id(lang_id: &str) -> Option<&'static dyn Frontend> {
    register_frontends();

    match lang_id {
        "c" | "c-header" => C_FRONTEND.get().map(|f| f as &'static dyn Frontend),
        "cpp" | "c++" | "c++-header" => CPP_FRONTEND.get().map(|f| f as &'static dyn Frontend),
        _ => None,
    }
}
