//! Transparent compression codecs (SPEC_FULL.md §4.2).

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{IoContext, SortxResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    None,
    Gzip,
    #[cfg(feature = "zstd")]
    Zstd,
}

impl Codec {
    /// Detects the codec from a file name's trailing extension, returning
    /// the codec and the name with that suffix stripped (spec.md §4.2:
    /// "compression suffix stripped first").
    pub fn detect(name: &str) -> (Codec, &str) {
        if let Some(stripped) = name.strip_suffix(".gz") {
            (Codec::Gzip, stripped)
        } else if let Some(stripped) = name.strip_suffix(".zst") {
            #[cfg(feature = "zstd")]
            {
                (Codec::Zstd, stripped)
            }
            #[cfg(not(feature = "zstd"))]
            {
                (Codec::None, name)
            }
        } else {
            (Codec::None, name)
        }
    }
}

pub fn open_reader(path: &Path, codec: Codec) -> SortxResult<Box<dyn BufRead>> {
    let path_str = path.display().to_string();
    let file = File::open(path).with_path(&path_str)?;
    match codec {
        Codec::None => Ok(Box::new(BufReader::new(file))),
        Codec::Gzip => Ok(Box::new(BufReader::new(GzDecoder::new(file)))),
        #[cfg(feature = "zstd")]
        Codec::Zstd => {
            let decoder = zstd::stream::read::Decoder::new(file).with_path(&path_str)?;
            Ok(Box::new(BufReader::new(decoder)))
        }
    }
}

pub fn create_writer(path: &Path, codec: Codec) -> SortxResult<Box<dyn Write>> {
    let path_str = path.display().to_string();
    let file = File::create(path).with_path(&path_str)?;
    match codec {
        Codec::None => Ok(Box::new(BufWriter::new(file))),
        Codec::Gzip => Ok(Box::new(GzEncoder::new(
            BufWriter::new(file),
            Compression::default(),
        ))),
        #[cfg(feature = "zstd")]
        Codec::Zstd => {
            let encoder = zstd::stream::write::Encoder::new(BufWriter::new(file), 0)
                .with_path(&path_str)?
                .auto_finish();
            Ok(Box::new(encoder))
        }
    }
}

/// Wraps an already-open reader (e.g. stdin) with the requested codec.
pub fn wrap_reader(inner: Box<dyn io::Read>, codec: Codec) -> Box<dyn BufRead> {
    match codec {
        Codec::None => Box::new(BufReader::new(inner)),
        Codec::Gzip => Box::new(BufReader::new(GzDecoder::new(inner))),
        #[cfg(feature = "zstd")]
        Codec::Zstd => Box::new(BufReader::new(
            zstd::stream::read::Decoder::new(inner).expect("zstd stream init"),
        )),
    }
}
