pub mod ela;
pub mod hashing;
pub mod signature;
pub mod steganography;
