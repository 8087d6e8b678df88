//! HTTP handlers.

pub mod annos;

pub use annos::{
    compat_create, compat_delete, compat_search, compat_search_form, compat_update,
    create_or_search, crud_api, health_check, negotiate_format, search, stash,
};
