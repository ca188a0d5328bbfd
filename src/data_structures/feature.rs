//! Geographic features and their geometry.
//!
//! Coordinates are expressed in the working spatial reference of the batch; for
//! geographic references `x` is the longitude, `y` the latitude (both degrees) and
//! `z` the height above the ellipsoid.

use std::{collections::BTreeMap, fmt};

use cgmath::Point3;

use crate::data_structures::expression::StringExpression;

#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => write!(f, "{s}"),
            AttributeValue::Int(i) => write!(f, "{i}"),
            AttributeValue::Double(d) => write!(f, "{d}"),
            AttributeValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Double(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    pub outer: Vec<Point3<f64>>,
    pub holes: Vec<Vec<Point3<f64>>>,
}

/// Feature geometry. Multi-part geometries nest arbitrarily.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Points(Vec<Point3<f64>>),
    LineString(Vec<Point3<f64>>),
    Ring(Vec<Point3<f64>>),
    Polygon(Polygon),
    Multi(Vec<Geometry>),
}

impl Geometry {
    pub fn point(x: f64, y: f64, z: f64) -> Self {
        Geometry::Points(vec![Point3::new(x, y, z)])
    }

    /// Iterates the point sequences of this geometry, see [`GeometryIterator`].
    pub fn parts(&self, traverse_holes: bool) -> GeometryIterator<'_> {
        GeometryIterator::new(Some(self), traverse_holes)
    }

    /// Number of points visited when iterating without polygon holes.
    pub fn total_points(&self) -> usize {
        self.parts(false).map(<[_]>::len).sum()
    }
}

/// Yields each point sequence contained in a geometry, flattening multi-part
/// geometries depth first. A polygon yields its outer ring, followed by its holes
/// if `traverse_holes` is set.
pub struct GeometryIterator<'a> {
    stack: Vec<&'a Geometry>,
    holes: Vec<&'a [Point3<f64>]>,
    traverse_holes: bool,
}

impl<'a> GeometryIterator<'a> {
    pub fn new(geometry: Option<&'a Geometry>, traverse_holes: bool) -> Self {
        Self {
            stack: geometry.into_iter().collect(),
            holes: Vec::new(),
            traverse_holes,
        }
    }
}

impl<'a> Iterator for GeometryIterator<'a> {
    type Item = &'a [Point3<f64>];

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(hole) = self.holes.pop() {
            return Some(hole);
        }
        while let Some(geometry) = self.stack.pop() {
            match geometry {
                Geometry::Multi(parts) => self.stack.extend(parts.iter().rev()),
                Geometry::Polygon(polygon) => {
                    if self.traverse_holes {
                        self.holes
                            .extend(polygon.holes.iter().rev().map(Vec::as_slice));
                    }
                    return Some(polygon.outer.as_slice());
                }
                Geometry::Points(points)
                | Geometry::LineString(points)
                | Geometry::Ring(points) => return Some(points.as_slice()),
            }
        }
        None
    }
}

/// A geographic entity: optional geometry plus named attributes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Feature {
    pub id: u64,
    pub geometry: Option<Geometry>,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Feature {
    pub fn new(id: u64, geometry: Geometry) -> Self {
        Self {
            id,
            geometry: Some(geometry),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Point sequences of the geometry, holes excluded.
    pub fn parts(&self) -> GeometryIterator<'_> {
        GeometryIterator::new(self.geometry.as_ref(), false)
    }

    /// Every point of the flattened geometry, holes excluded.
    pub fn points(&self) -> impl Iterator<Item = &Point3<f64>> {
        self.parts().flatten()
    }

    pub fn eval(&self, expr: &StringExpression) -> String {
        expr.eval(self)
    }
}
