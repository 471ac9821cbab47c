//! # kp2bw – KeePass source reader
//!
//! Reads KeePass 2.x databases into flat, normalized [`keepass::SourceEntry`]
//! records:
//!
//! - **XML export** – KeePass 2.x XML documents, including protected-field
//!   flags, tags, and binary attachments from the meta binary pool
//! - **KDBX** – encrypted `.kdbx` files (cargo feature `kdbx`)

pub mod keepass;
