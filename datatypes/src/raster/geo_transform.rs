use crate::primitives::{BoundingBox2D, Coordinate2D};
use float_cmp::approx_eq;
use serde::{Deserialize, Serialize};

use super::Window;

/// This is a typedef for the `GDAL GeoTransform`. It represents an affine transformation matrix.
pub type GdalGeoTransform = [f64; 6];

/// The `GeoTransform` is a more user friendly representation of the `GDAL GeoTransform` affine transformation matrix.
/// Unlike a north-up grid, it keeps the two rotation terms.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_coordinate: Coordinate2D,
    pub x_pixel_size: f64,
    pub y_pixel_size: f64,
    pub x_rotation: f64,
    pub y_rotation: f64,
}

impl GeoTransform {
    /// Generates a new north-up `GeoTransform`
    ///
    /// # Examples
    ///
    /// ```
    /// use geoutils_datatypes::raster::GeoTransform;
    ///
    /// let geo_transform = GeoTransform::new((0.0, 0.0).into(), 1.0, -1.0);
    /// ```
    ///
    pub fn new(origin_coordinate: Coordinate2D, x_pixel_size: f64, y_pixel_size: f64) -> Self {
        Self {
            origin_coordinate,
            x_pixel_size,
            y_pixel_size,
            x_rotation: 0.0,
            y_rotation: 0.0,
        }
    }

    /// Generates a new `GeoTransform` with explicit x, y values of the upper left edge
    ///
    /// # Examples
    ///
    /// ```
    /// use geoutils_datatypes::raster::GeoTransform;
    ///
    /// let geo_transform = GeoTransform::new_with_coordinate_x_y(0.0, 1.0, 0.0, -1.0);
    /// ```
    ///
    pub fn new_with_coordinate_x_y(
        origin_coordinate_x: f64,
        x_pixel_size: f64,
        origin_coordinate_y: f64,
        y_pixel_size: f64,
    ) -> Self {
        Self::new(
            (origin_coordinate_x, origin_coordinate_y).into(),
            x_pixel_size,
            y_pixel_size,
        )
    }

    /// Transforms a fractional pixel position (column, row) into a SRS coordinate (x, y).
    /// See GDAL documentation for more details: <https://gdal.org/user/raster_data_model.html>
    ///
    /// # Examples
    ///
    /// ```
    /// use geoutils_datatypes::raster::GeoTransform;
    ///
    /// let geo_transform = GeoTransform::new_with_coordinate_x_y(0.0, 1.0, 0.0, -1.0);
    /// assert_eq!(geo_transform.pixel_to_coordinate(2.0, 3.0), (2.0, -3.0).into())
    /// ```
    ///
    pub fn pixel_to_coordinate(&self, column: f64, row: f64) -> Coordinate2D {
        Coordinate2D::new(
            self.origin_coordinate.x + column * self.x_pixel_size + row * self.x_rotation,
            self.origin_coordinate.y + column * self.y_rotation + row * self.y_pixel_size,
        )
    }

    /// Transforms a SRS coordinate (x, y) into a fractional pixel position (column, row).
    /// Returns `None` if the transform is not invertible.
    pub fn coordinate_to_pixel(&self, coordinate: Coordinate2D) -> Option<(f64, f64)> {
        let determinant =
            self.x_pixel_size * self.y_pixel_size - self.x_rotation * self.y_rotation;

        if determinant == 0.0 {
            return None;
        }

        let dx = coordinate.x - self.origin_coordinate.x;
        let dy = coordinate.y - self.origin_coordinate.y;

        let column = (self.y_pixel_size * dx - self.x_rotation * dy) / determinant;
        let row = (self.x_pixel_size * dy - self.y_rotation * dx) / determinant;

        Some((column, row))
    }

    /// The transform of a sub region of the grid. Only the origin moves, pixel size and
    /// rotation stay the same.
    ///
    /// # Examples
    ///
    /// ```
    /// use geoutils_datatypes::raster::{GeoTransform, Window};
    ///
    /// let geo_transform = GeoTransform::new_with_coordinate_x_y(0.0, 10.0, 100.0, -10.0);
    /// let window = Window::new(2, 3, 4, 4);
    ///
    /// let window_transform = geo_transform.window_transform(&window);
    /// assert_eq!(window_transform.origin_coordinate, (20.0, 70.0).into());
    /// ```
    ///
    #[must_use]
    pub fn window_transform(&self, window: &Window) -> Self {
        Self {
            origin_coordinate: self
                .pixel_to_coordinate(window.col_off as f64, window.row_off as f64),
            ..*self
        }
    }

    /// The bounding box of a grid of `width` x `height` pixels that starts at the origin.
    pub fn bounds(&self, width: usize, height: usize) -> BoundingBox2D {
        let (width, height) = (width as f64, height as f64);

        BoundingBox2D::from_coord_iter([
            self.pixel_to_coordinate(0.0, 0.0),
            self.pixel_to_coordinate(width, 0.0),
            self.pixel_to_coordinate(0.0, height),
            self.pixel_to_coordinate(width, height),
        ])
        .unwrap_or_else(|| {
            BoundingBox2D::new_unchecked(self.origin_coordinate, self.origin_coordinate)
        })
    }

    /// Compares all six coefficients with an absolute tolerance.
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        GdalGeoTransform::from(*self)
            .iter()
            .zip(GdalGeoTransform::from(*other).iter())
            .all(|(a, b)| approx_eq!(f64, *a, *b, epsilon = epsilon))
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        GeoTransform::new_with_coordinate_x_y(0.0, 1.0, 0.0, -1.0)
    }
}

impl From<GdalGeoTransform> for GeoTransform {
    fn from(gdal_geo_transform: GdalGeoTransform) -> Self {
        Self {
            origin_coordinate: (gdal_geo_transform[0], gdal_geo_transform[3]).into(),
            x_pixel_size: gdal_geo_transform[1],
            x_rotation: gdal_geo_transform[2],
            y_rotation: gdal_geo_transform[4],
            y_pixel_size: gdal_geo_transform[5],
        }
    }
}

impl From<GeoTransform> for GdalGeoTransform {
    fn from(geo_transform: GeoTransform) -> GdalGeoTransform {
        [
            geo_transform.origin_coordinate.x,
            geo_transform.x_pixel_size,
            geo_transform.x_rotation,
            geo_transform.origin_coordinate.y,
            geo_transform.y_rotation,
            geo_transform.y_pixel_size,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    #[allow(clippy::float_cmp)]
    fn geo_transform_new() {
        let geo_transform = GeoTransform::new((0.0, 1.0).into(), 2.0, -3.0);
        assert_eq!(geo_transform.origin_coordinate.x, 0.0);
        assert_eq!(geo_transform.origin_coordinate.y, 1.0);
        assert_eq!(geo_transform.x_pixel_size, 2.0);
        assert_eq!(geo_transform.y_pixel_size, -3.0);
        assert_eq!(geo_transform.x_rotation, 0.0);
        assert_eq!(geo_transform.y_rotation, 0.0);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn gdal_geo_transform_keeps_rotation() {
        let gdal_geo_transform: GdalGeoTransform = [10.0, 2.0, 0.5, 20.0, 0.25, -2.0];
        let geo_transform = GeoTransform::from(gdal_geo_transform);

        assert_eq!(geo_transform.x_rotation, 0.5);
        assert_eq!(GdalGeoTransform::from(geo_transform), gdal_geo_transform);
    }

    #[test]
    fn pixel_to_coordinate_and_back() {
        let geo_transform = GeoTransform::from([10.0, 2.0, 0.5, 20.0, 0.25, -2.0]);

        let coordinate = geo_transform.pixel_to_coordinate(3.0, 4.0);
        assert_eq!(coordinate, (10.0 + 6.0 + 2.0, 20.0 + 0.75 - 8.0).into());

        let (column, row) = geo_transform.coordinate_to_pixel(coordinate).unwrap();
        assert!(approx_eq!(f64, column, 3.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, row, 4.0, epsilon = 1e-9));
    }

    #[test]
    fn degenerate_transform_is_not_invertible() {
        let geo_transform = GeoTransform::new((0.0, 0.0).into(), 0.0, -1.0);
        assert!(geo_transform.coordinate_to_pixel((1.0, 1.0).into()).is_none());
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn window_transform_translates_origin() {
        let geo_transform = GeoTransform::from([10.0, 2.0, 0.5, 20.0, 0.25, -2.0]);
        let window = Window::new(3, 4, 16, 16);

        let window_transform = geo_transform.window_transform(&window);

        assert_eq!(
            window_transform.origin_coordinate,
            geo_transform.pixel_to_coordinate(3.0, 4.0)
        );
        assert_eq!(window_transform.x_pixel_size, geo_transform.x_pixel_size);
        assert_eq!(window_transform.y_pixel_size, geo_transform.y_pixel_size);
        assert_eq!(window_transform.x_rotation, geo_transform.x_rotation);
        assert_eq!(window_transform.y_rotation, geo_transform.y_rotation);
    }

    #[test]
    fn bounds_of_north_up_grid() {
        let geo_transform = GeoTransform::new_with_coordinate_x_y(0.0, 10.0, 100.0, -10.0);
        let bounds = geo_transform.bounds(10, 5);

        assert_eq!(bounds.upper_left(), (0.0, 100.0).into());
        assert_eq!(bounds.lower_right(), (100.0, 50.0).into());
    }

    #[test]
    fn approx_eq_tolerates_rounding() {
        let a = GeoTransform::new_with_coordinate_x_y(0.0, 10.0, 100.0, -10.0);
        let b = GeoTransform::new_with_coordinate_x_y(1e-9, 10.0, 100.0, -10.0);
        let c = GeoTransform::new_with_coordinate_x_y(1.0, 10.0, 100.0, -10.0);

        assert!(a.approx_eq(&b, 1e-6));
        assert!(!a.approx_eq(&c, 1e-6));
    }
}
