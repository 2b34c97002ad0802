#![allow(dead_code)]

pub mod ingest_server;
