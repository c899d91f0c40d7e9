/// Filter, sort and page emulation over cached records.
pub mod collection;
/// Entity-definition-aware fetch and persistence entry point.
pub mod crud;
/// Canonical fetch request keys.
pub mod descriptor;
/// Record and id types.
pub mod entity;
/// Entity configuration: name, parents, field types and transforms.
pub mod entitydefinition;
/// Declared field types.
pub mod fieldtype;
/// Response body decoding.
pub mod parse;
/// Fluent endpoint and URL construction.
pub mod querybuilder;
/// Routing of CRUD operations onto endpoint builders.
pub mod routes;
/// In-memory stub data source.
pub mod stubs;
/// Transport boundary and the HTTP implementation.
pub mod transport;
