//! Real/complex scalar values as they cross the scripting boundary.
//!
//! Configuration scripts produce plain numbers and complex pairs interchangeably.
//! [`Scalar`] captures that distinction once, where a script value is read, so the
//! numerical code only ever sees [`c64`].

use faer::c64;
use std::fmt;

/// A scalar read from, or passed to, the configuration script.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Real(f64),
    Complex(c64),
}

impl Scalar {
    /// Widens the scalar to a complex number.
    #[inline]
    pub fn to_complex(self) -> c64 {
        match self {
            Scalar::Real(re) => c64::new(re, 0.0),
            Scalar::Complex(z) => z,
        }
    }

    /// Narrows a complex number back to a real scalar when its imaginary part is exactly zero.
    pub fn from_complex(z: c64) -> Self {
        if z.im == 0.0 {
            Scalar::Real(z.re)
        } else {
            Scalar::Complex(z)
        }
    }

    /// Label used in file names of persisted vectors, e.g. `1.500000` or `1.500000-0.250000j`.
    ///
    /// Parts that six decimals cannot represent exactly fall back to their shortest
    /// round-trip form, so distinct values always get distinct labels.
    pub fn file_label(self) -> String {
        match Scalar::from_complex(self.to_complex()) {
            Scalar::Real(re) => label_part(re, false),
            Scalar::Complex(z) => format!("{}{}j", label_part(z.re, false), label_part(z.im, true)),
        }
    }
}

fn label_part(x: f64, signed: bool) -> String {
    let fixed = if signed { format!("{x:+.6}") } else { format!("{x:.6}") };
    if fixed.parse::<f64>() == Ok(x) {
        fixed
    } else if signed {
        format!("{x:+}")
    } else {
        format!("{x}")
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Real(value)
    }
}

impl From<c64> for Scalar {
    fn from(value: c64) -> Self {
        Scalar::Complex(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Real(re) => write!(f, "{re:.3}"),
            Scalar::Complex(z) => write!(f, "{}", DisplayComplex(*z)),
        }
    }
}

/// Formats a complex number as `re+imj` with three decimals, the layout of the sweep log.
pub struct DisplayComplex(pub c64);

impl fmt::Display for DisplayComplex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}{:+.3}j", self.0.re, self.0.im)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_complex_widens_real() {
        assert_eq!(Scalar::Real(2.5).to_complex(), c64::new(2.5, 0.0));
        let z = c64::new(1.0, -3.0);
        assert_eq!(Scalar::Complex(z).to_complex(), z);
    }

    #[test]
    fn test_from_complex_narrows_only_exact_reals() {
        assert_eq!(Scalar::from_complex(c64::new(4.0, 0.0)), Scalar::Real(4.0));
        assert_eq!(
            Scalar::from_complex(c64::new(4.0, 1e-300)),
            Scalar::Complex(c64::new(4.0, 1e-300))
        );
    }

    #[test]
    fn test_file_label() {
        assert_eq!(Scalar::Real(1.5).file_label(), "1.500000");
        assert_eq!(
            Scalar::Complex(c64::new(1.5, -0.25)).file_label(),
            "1.500000-0.250000j"
        );
        // A complex value with a zero imaginary part is labelled like a real one.
        assert_eq!(Scalar::Complex(c64::new(2.0, 0.0)).file_label(), "2.000000");
    }

    #[test]
    fn test_file_label_keeps_digits_beyond_six_decimals() {
        let a = Scalar::Real(1.0000001).file_label();
        let b = Scalar::Real(1.0000002).file_label();
        assert_eq!(a, "1.0000001");
        assert_eq!(b, "1.0000002");
        assert_eq!(Scalar::Real(1.0).file_label(), "1.000000");
        assert_eq!(
            Scalar::Complex(c64::new(0.5, -1e-9)).file_label(),
            "0.500000-0.000000001j"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Scalar::Real(0.5).to_string(), "0.500");
        assert_eq!(DisplayComplex(c64::new(1.0, -2.0)).to_string(), "1.000-2.000j");
        assert_eq!(
            Scalar::Complex(c64::new(-0.125, 0.5)).to_string(),
            "-0.125+0.500j"
        );
    }
}
