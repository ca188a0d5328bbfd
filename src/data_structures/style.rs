//! Styles and the symbols they carry.

use cgmath::{Deg, Matrix4};

use crate::data_structures::expression::StringExpression;

/// Names the model to instantiate at each feature point.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerSymbol {
    /// Model reference, evaluated per feature.
    pub marker: StringExpression,
    /// Uniform scale applied to the model before placement.
    pub scale: Option<f64>,
    /// Clockwise rotation from north about the local up axis, in degrees.
    pub heading: Option<f64>,
}

impl MarkerSymbol {
    pub fn new(marker: &str) -> Self {
        Self {
            marker: StringExpression::new(marker),
            scale: None,
            heading: None,
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }

    /// Model matrix contributed by the symbol itself: scale first, then heading.
    pub fn model_matrix(&self) -> Matrix4<f64> {
        Matrix4::from_angle_z(Deg(-self.heading.unwrap_or(0.0)))
            * Matrix4::from_scale(self.scale.unwrap_or(1.0))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LineSymbol {
    pub color: [f32; 4],
    pub width: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolygonSymbol {
    pub color: [f32; 4],
}

#[derive(Clone, Debug, PartialEq)]
pub enum Symbol {
    Marker(MarkerSymbol),
    Line(LineSymbol),
    Polygon(PolygonSymbol),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Style {
    pub name: String,
    pub symbols: Vec<Symbol>,
}

impl Style {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            symbols: Vec::new(),
        }
    }

    pub fn with_symbol(mut self, symbol: Symbol) -> Self {
        self.symbols.push(symbol);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn marker(&self) -> Option<&MarkerSymbol> {
        self.symbols.iter().find_map(|symbol| match symbol {
            Symbol::Marker(marker) => Some(marker),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Point3, Transform};

    #[test]
    fn heading_turns_clockwise_after_scaling() {
        let symbol = MarkerSymbol::new("tree.gltf").with_scale(2.0).with_heading(90.0);
        // north (+y) turned 90 degrees clockwise faces east (+x)
        let p = symbol.model_matrix().transform_point(Point3::new(0.0, 1.0, 0.0));
        assert!((p.x - 2.0).abs() < 1e-12 && p.y.abs() < 1e-12);
    }

    #[test]
    fn marker_is_the_first_marker_symbol() {
        let style = Style::new("s")
            .with_symbol(Symbol::Polygon(PolygonSymbol { color: [1.0; 4] }))
            .with_symbol(Symbol::Marker(MarkerSymbol::new("a")))
            .with_symbol(Symbol::Marker(MarkerSymbol::new("b")));
        assert_eq!(style.marker(), Some(&MarkerSymbol::new("a")));
        assert!(Style::new("empty").marker().is_none());
    }
}
