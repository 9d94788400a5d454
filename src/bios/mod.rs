//! # BIOS module
//!
//! Middleware between the `fs` and `img` modules, named in analogy with the CP/M
//! BIOS that sat between the BDOS and the drive.  At present this means translating
//! between ProDOS blocks and DOS 3.3 track/sector pairs, so that either kind of
//! file system can live on either ordering of disk image.

pub mod skew;
