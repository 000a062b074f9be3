//! Precompression of build artifacts.
//!
//! Every compressible artifact gets two siblings, `<file>.gz` and
//! `<file>.br`, encoded at the highest level each codec offers so the
//! server never compresses on the request path.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use thiserror::Error;

/// Brotli quality (0-11). Build time is cheap compared to bytes on the wire.
const BROTLI_QUALITY: i32 = 11;

/// Brotli window size (10-24).
const BROTLI_WINDOW: i32 = 22;

/// Content encodings produced at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Gzip,
    Brotli,
}

impl Encoding {
    /// File name suffix appended to the original path.
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Gzip => ".gz",
            Self::Brotli => ".br",
        }
    }

    /// `Content-Encoding` token.
    pub const fn token(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Brotli => "br",
        }
    }

    /// Sibling path for `path` under this encoding (`app.js` → `app.js.br`).
    pub fn sibling(self, path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(self.suffix());
        PathBuf::from(name)
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Error)]
pub enum CompressError {
    #[error("cannot read `{0}`")]
    Read(PathBuf, #[source] io::Error),

    #[error("{encoding} encoding failed for `{path}`")]
    Encode {
        encoding: Encoding,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write `{0}`")]
    Write(PathBuf, #[source] io::Error),
}

/// Both encoded representations of one input.
#[derive(Debug)]
pub struct Compressed {
    pub gzip: Vec<u8>,
    pub brotli: Vec<u8>,
}

impl Compressed {
    fn get(&self, encoding: Encoding) -> &[u8] {
        match encoding {
            Encoding::Gzip => &self.gzip,
            Encoding::Brotli => &self.brotli,
        }
    }
}

/// Encode `data` with gzip and brotli at maximum compression.
///
/// Fails as a whole if either encoder fails.
pub fn compress(data: &[u8]) -> Result<Compressed, (Encoding, io::Error)> {
    let gzip = gzip(data).map_err(|e| (Encoding::Gzip, e))?;
    let brotli = brotli(data).map_err(|e| (Encoding::Brotli, e))?;
    Ok(Compressed { gzip, brotli })
}

fn gzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::best());
    encoder.write_all(data)?;
    encoder.finish()
}

fn brotli(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut output = Vec::with_capacity(data.len() / 2);
    let mut input = io::Cursor::new(data);
    let params = brotli::enc::BrotliEncoderParams {
        quality: BROTLI_QUALITY,
        lgwin: BROTLI_WINDOW,
        ..Default::default()
    };
    brotli::BrotliCompress(&mut input, &mut output, &params)?;
    Ok(output)
}

/// Write `.gz` and `.br` siblings next to `path`.
///
/// Both encodings are produced in memory before anything is written, so a
/// failing encoder leaves no sibling behind. If the brotli write fails the
/// gzip sibling is removed again, so siblings exist in pairs. The siblings
/// inherit the original's permission bits (the link itself is stat'ed, not
/// its target).
pub fn precompress_file(path: &Path) -> Result<(), CompressError> {
    let contents = fs::read(path).map_err(|e| CompressError::Read(path.to_path_buf(), e))?;
    let permissions = fs::symlink_metadata(path)
        .map_err(|e| CompressError::Read(path.to_path_buf(), e))?
        .permissions();

    let compressed = compress(&contents).map_err(|(encoding, source)| CompressError::Encode {
        encoding,
        path: path.to_path_buf(),
        source,
    })?;

    let gzip = Encoding::Gzip.sibling(path);
    write_with_permissions(&gzip, compressed.get(Encoding::Gzip), &permissions)
        .map_err(|e| CompressError::Write(gzip.clone(), e))?;

    let brotli = Encoding::Brotli.sibling(path);
    if let Err(e) = write_with_permissions(&brotli, compressed.get(Encoding::Brotli), &permissions)
    {
        let _ = fs::remove_file(&gzip);
        return Err(CompressError::Write(brotli, e));
    }
    Ok(())
}

fn write_with_permissions(path: &Path, data: &[u8], permissions: &fs::Permissions) -> io::Result<()> {
    fs::write(path, data)?;
    fs::set_permissions(path, permissions.clone())
}
