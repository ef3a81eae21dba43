//! `portico-kernel`: contracts for the Portico API gateway control plane.
//!
//! Everything in this crate is pure data and trait definitions. Concrete
//! route engines, stores, filters and the HTTP surface live in
//! `portico-gateway`.

pub mod gateway;
