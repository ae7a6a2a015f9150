//! ARM-RPC resource provider front end: generic CRUD controllers, async
//! operation tracking, and the HTTP server that hosts them.

pub mod controller;
pub mod network;
pub mod resources;
pub mod rest;
pub mod service;
pub mod statusmanager;
pub mod store;
