//! Filter context: the session, the working profile and the extent of a batch.
//!
//! Besides carrying state, this module computes the localizers of a batch. The
//! local frame is centered on the batch extent so that instance geometry stays
//! small in magnitude; the returned group node puts it back in place.

use std::sync::Arc;

use cgmath::{EuclideanSpace, Matrix4, Point3, SquareMatrix};

use crate::{resolver::ModelResolver, srs::SpatialReference};

/// Runtime capability switches.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub feature_substitution: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            feature_substitution: true,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MapInfo {
    pub geocentric: bool,
}

/// State shared by every batch of a map: the frame type, capabilities and the
/// resolver that turns marker references into template models.
pub struct Session {
    map_info: MapInfo,
    capabilities: Capabilities,
    resolver: Arc<dyn ModelResolver>,
}

impl Session {
    pub fn new(map_info: MapInfo, resolver: Arc<dyn ModelResolver>) -> Self {
        Self {
            map_info,
            capabilities: Capabilities::default(),
            resolver,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn map_info(&self) -> &MapInfo {
        &self.map_info
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn resolver(&self) -> &dyn ModelResolver {
        self.resolver.as_ref()
    }
}

#[derive(Clone, Debug)]
pub struct Profile {
    pub srs: Arc<dyn SpatialReference>,
}

impl Profile {
    pub fn new(srs: Arc<dyn SpatialReference>) -> Self {
        Self { srs }
    }
}

/// Axis aligned extent in the profile's spatial reference.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoExtent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl GeoExtent {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn centroid(&self) -> Point3<f64> {
        Point3::new(
            (self.xmin + self.xmax) * 0.5,
            (self.ymin + self.ymax) * 0.5,
            0.0,
        )
    }
}

#[derive(Clone)]
pub struct FilterContext {
    session: Arc<Session>,
    profile: Profile,
    extent: Option<GeoExtent>,
}

impl FilterContext {
    pub fn new(session: Arc<Session>, profile: Profile) -> Self {
        Self {
            session,
            profile,
            extent: None,
        }
    }

    pub fn with_extent(mut self, extent: GeoExtent) -> Self {
        self.extent = Some(extent);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn extent(&self) -> Option<&GeoExtent> {
        self.extent.as_ref()
    }

    pub fn is_geocentric(&self) -> bool {
        self.session.map_info().geocentric
    }

    /// A context is georeferenced once it knows the extent of its batch.
    pub fn is_georeferenced(&self) -> bool {
        self.extent.is_some()
    }
}

/// Matrices between the batch's absolute frame and its local frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Localizers {
    pub local2world: Matrix4<f64>,
    pub world2local: Matrix4<f64>,
}

impl Default for Localizers {
    fn default() -> Self {
        Self {
            local2world: Matrix4::identity(),
            world2local: Matrix4::identity(),
        }
    }
}

/// Localizers for the batch described by `cx`.
///
/// Geocentric batches are localized to the east/north/up frame at the extent
/// centroid (skipped for geographic extents 180 degrees wide or more, where a
/// single tangent frame is meaningless). Flat batches are localized by a plain
/// translation to the centroid. Without an extent both matrices are identity.
pub fn compute_localizers(cx: &FilterContext) -> Localizers {
    let Some(extent) = cx.extent() else {
        return Localizers::default();
    };

    let local2world = if cx.is_geocentric() {
        let srs = &cx.profile().srs;
        if srs.is_geographic() && extent.width() >= 180.0 {
            log::debug!(
                "Extent is {} degrees wide; not localizing the batch.",
                extent.width()
            );
            return Localizers::default();
        }
        let (centroid, rotation) = srs.to_ecef_with_rotation(extent.centroid());
        Matrix4::from_translation(centroid.to_vec()) * rotation
    } else {
        Matrix4::from_translation(extent.centroid().to_vec())
    };

    match local2world.invert() {
        Some(world2local) => Localizers {
            local2world,
            world2local,
        },
        None => {
            log::warn!("Localization matrix for extent {:?} is singular.", extent);
            Localizers::default()
        }
    }
}
