//! PostgreSQL on-disk format parsing and formatting.
//!
//! The modules here follow the dependency order of the format itself:
//! [`relfile`] reads blocks, [`page`] parses their headers and item arrays,
//! [`special`] classifies the trailing section, [`tuple`] interprets item
//! payloads, [`decode`] turns tuple bytes into typed column text, and
//! [`toast`] reconstructs out-of-line values by re-entering the same
//! pipeline on a side relation. [`dump`] drives them all in order.

pub mod checksum;
pub mod constants;
pub mod controlfile;
pub mod copyline;
pub mod decode;
pub mod dump;
pub mod page;
pub mod pglz;
pub mod relfile;
pub mod relmap;
pub mod special;
pub mod toast;
pub mod tuple;
