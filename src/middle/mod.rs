//! Middle module - typed tree and object layout

pub mod layout;
pub mod typed_ast;
