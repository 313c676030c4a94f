use std::{
    fs::File,
    io::{Error as IoError, ErrorKind as IoErrorKind, Read, Result as IoResult, Write},
    path::Path,
};

use serde::{Serialize, de::DeserializeOwned};

/// Values persisted to disk: token state, chain, keys.
pub trait Saveable
where
    Self: Sized,
{
    fn load<I: Read>(reader: I) -> IoResult<Self>;
    fn save<O: Write>(&self, writer: O) -> IoResult<()>;

    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> IoResult<()> {
        let file = File::create(&path)?;
        self.save(file)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> IoResult<Self> {
        let file = File::open(&path)?;
        Self::load(file)
    }
}

pub(crate) fn load_cbor<T: DeserializeOwned, I: Read>(reader: I, what: &str) -> IoResult<T> {
    ciborium::de::from_reader(reader).map_err(|_| {
        IoError::new(
            IoErrorKind::InvalidData,
            format!("Failed to deserialise {what}"),
        )
    })
}

pub(crate) fn save_cbor<T: Serialize, O: Write>(value: &T, writer: O, what: &str) -> IoResult<()> {
    ciborium::ser::into_writer(value, writer).map_err(|_| {
        IoError::new(
            IoErrorKind::InvalidData,
            format!("Failed to serialise {what}"),
        )
    })
}
