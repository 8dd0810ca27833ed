pub mod positions;
pub mod rescues;
pub mod routes;
pub mod shops;
