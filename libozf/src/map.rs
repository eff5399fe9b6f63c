use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use tracing::{debug, info, instrument, trace};

use crate::{
    calibration::MapCalibration, container::OzfContainer, transform::Point, Error,
    TransformStrategy,
};

const SIDECAR_EXTENSIONS: [&str; 2] = ["map", "MAP"];

/// Fires exactly once, on the first call to [`FirstCallProbe::fire`]
#[derive(Debug, Default)]
pub struct FirstCallProbe {
    fired: AtomicBool,
}

impl FirstCallProbe {
    /// Returns `true` on the first call only, even across threads
    pub fn fire(&self) -> bool {
        !self.fired.swap(true, Ordering::Relaxed)
    }

    /// Whether [`Self::fire`] was called
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Relaxed)
    }
}

/// A container opened together with its calibration.
///
/// Decoded tiles are kept for the lifetime of the map.
#[derive(Debug)]
pub struct LoadedMap {
    id: String,
    name: String,
    calibration: MapCalibration,
    container_path: PathBuf,
    sidecar_path: PathBuf,
    container: OzfContainer,
    tile_cache: Mutex<HashMap<(u32, u32), Arc<[u8]>>>,
    probe: FirstCallProbe,
}

/// Finds the `.map` file next to a container
///
/// # Errors
///
/// [`Error::SidecarNotFound`] if neither `<stem>.map` nor `<stem>.MAP` exists
pub fn sidecar_path(container: &Path) -> Result<PathBuf, Error> {
    SIDECAR_EXTENSIONS
        .iter()
        .map(|ext| container.with_extension(ext))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| Error::SidecarNotFound(container.to_path_buf()))
}

impl LoadedMap {
    /// Opens the container at `path` and the `.map` file next to it.
    ///
    /// # Errors
    ///
    /// - [`Error::SidecarNotFound`] if no `.map` file sits next to the container
    /// - any error of [`MapCalibration::from_file`] or [`OzfContainer::open`]
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let container_path = path.as_ref().to_path_buf();
        let sidecar_path = sidecar_path(&container_path)?;
        let calibration = MapCalibration::from_file(&sidecar_path)?;
        let container = OzfContainer::open(&container_path)?;
        Ok(Self::assemble(
            container_path,
            sidecar_path,
            calibration,
            container,
            FirstCallProbe::default(),
        ))
    }

    /// Builds a map from parts that were opened separately.
    ///
    /// `probe` decides when the first geo to pixel conversion is reported; a probe that has
    /// already fired keeps the map quiet.
    #[must_use]
    pub fn assemble(
        container_path: PathBuf,
        sidecar_path: PathBuf,
        calibration: MapCalibration,
        container: OzfContainer,
        probe: FirstCallProbe,
    ) -> Self {
        let id = sha256::digest(&*container_path.to_string_lossy());
        let name = container_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(%id, %name, bounds = ?calibration.bounds(), "Loaded map");
        Self {
            id,
            name,
            calibration,
            container_path,
            sidecar_path,
            container,
            tile_cache: Mutex::new(HashMap::new()),
            probe,
        }
    }

    /// SHA-256 hex digest of the container path
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// File stem of the container
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The map's calibration
    #[must_use]
    pub const fn calibration(&self) -> &MapCalibration {
        &self.calibration
    }

    /// The map's container
    #[must_use]
    pub const fn container(&self) -> &OzfContainer {
        &self.container
    }

    /// Path the container was opened from
    #[must_use]
    pub fn container_path(&self) -> &Path {
        &self.container_path
    }

    /// Path of the `.map` file
    #[must_use]
    pub fn sidecar_path(&self) -> &Path {
        &self.sidecar_path
    }

    /// Number of tiles decoded so far
    #[must_use]
    pub fn cached_tiles(&self) -> usize {
        self.tile_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Decompressed bytes of tile `(x, y)`, decoded on first use.
    ///
    /// Two threads missing the same tile may both decode it; the first insert wins.
    ///
    /// # Errors
    ///
    /// Any error of [`OzfContainer::extract_tile`]. Failed tiles are not cached.
    pub fn tile(&self, x: u32, y: u32) -> Result<Arc<[u8]>, Error> {
        if let Some(tile) = self
            .tile_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(x, y))
        {
            trace!(x, y, "Tile cache hit");
            return Ok(Arc::clone(tile));
        }

        let decoded: Arc<[u8]> = self.container.extract_tile(x, y)?.into_bytes().into();
        let mut cache = self
            .tile_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry((x, y)).or_insert(decoded)))
    }

    /// See [`MapCalibration::pixel_to_geo`]
    #[must_use]
    pub fn pixel_to_geo(&self, px: f64, py: f64) -> (f64, f64) {
        self.calibration.pixel_to_geo(px, py)
    }

    /// See [`MapCalibration::geo_to_pixel`].
    ///
    /// The first call logs the strategy in use.
    #[must_use]
    pub fn geo_to_pixel(&self, lat: f64, lon: f64) -> Point {
        if self.probe.fire() {
            let strategy: TransformStrategy = self.calibration.inverse_strategy();
            debug!(map = %self.name, %strategy, "First geo to pixel conversion");
        }
        self.calibration.geo_to_pixel(lat, lon)
    }

    /// Probe reporting the first geo to pixel conversion
    #[must_use]
    pub fn probe(&self) -> &FirstCallProbe {
        &self.probe
    }
}
