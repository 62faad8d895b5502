use std::{fmt, hash::Hasher};

use fnv::FnvHasher;
use ndarray::{Array2, ArrayView1};
use once_cell::sync::OnceCell;

use crate::Error;

pub(crate) const ALPHABET_LEN: usize = 4;

/// A nucleobase in the fixed A, C, G, T row order used by every PWM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Base {
    A,
    C,
    G,
    T,
}

impl Base {
    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::C => 1,
            Self::G => 2,
            Self::T => 3,
        }
    }

    #[inline]
    pub fn complement(self) -> Self {
        match self {
            Self::A => Self::T,
            Self::C => Self::G,
            Self::G => Self::C,
            Self::T => Self::A,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Self::A => b'A',
            Self::C => b'C',
            Self::G => b'G',
            Self::T => b'T',
        }
    }
}

impl TryFrom<u8> for Base {
    type Error = InvalidBase;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            b'A' | b'a' => Self::A,
            b'C' | b'c' => Self::C,
            b'G' | b'g' => Self::G,
            b'T' | b't' => Self::T,
            _ => return Err(InvalidBase(value)),
        })
    }
}

impl fmt::Display for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::A => "A",
            Self::C => "C",
            Self::G => "G",
            Self::T => "T",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvalidBase(pub u8);

/// A position-weight matrix over the DNA alphabet.
///
/// The backing matrix has exactly 4 rows (A, C, G, T) and at least one
/// column. Values are arbitrary reals; no normalization is assumed.
#[derive(Debug, Clone)]
pub struct Pwm {
    matrix: Array2<f32>,
    hash: OnceCell<u64>,
}

impl PartialEq for Pwm {
    fn eq(&self, other: &Self) -> bool {
        self.matrix == other.matrix
    }
}

impl Pwm {
    pub fn new(matrix: Array2<f32>) -> Result<Self, Error> {
        let (rows, columns) = matrix.dim();
        if rows != ALPHABET_LEN || columns == 0 {
            return Err(Error::InvalidShape { rows, columns });
        }

        Ok(Self {
            matrix,
            hash: OnceCell::new(),
        })
    }

    /// One-hot matrix for a consensus sequence, one column per base.
    pub fn from_consensus(sequence: &[u8]) -> Result<Self, Error> {
        let mut matrix = Array2::zeros((ALPHABET_LEN, sequence.len()));
        for (column, &byte) in sequence.iter().enumerate() {
            let base =
                Base::try_from(byte).map_err(|InvalidBase(byte)| Error::InvalidBase(byte.into()))?;
            matrix[(base.index(), column)] = 1.;
        }

        Self::new(matrix)
    }

    /// Number of columns.
    #[allow(clippy::len_without_is_empty)] // a PWM has at least one column
    #[inline]
    pub fn len(&self) -> usize {
        self.matrix.ncols()
    }

    #[inline]
    pub fn matrix(&self) -> &Array2<f32> {
        &self.matrix
    }

    #[inline]
    pub(crate) fn column(&self, index: usize) -> ArrayView1<'_, f32> {
        self.matrix.column(index)
    }

    /// Reverse the column order and swap complementary rows (A↔T, C↔G).
    pub fn reverse_complement(&self) -> Self {
        let (rows, columns) = self.matrix.dim();
        let matrix = Array2::from_shape_fn((rows, columns), |(row, column)| {
            self.matrix[(rows - 1 - row, columns - 1 - column)]
        });

        Self {
            matrix,
            hash: OnceCell::new(),
        }
    }

    /// Euclidean norm of each column, the score ceiling used for pruning.
    pub(crate) fn column_norms(&self) -> Vec<f32> {
        (0..self.len())
            .map(|column| {
                let column = self.column(column);
                column.dot(&column).sqrt()
            })
            .collect()
    }

    /// FNV hash over the matrix content, memoized after the first use.
    pub(crate) fn content_hash(&self) -> u64 {
        *self.hash.get_or_init(|| {
            let mut hasher = FnvHasher::default();
            let (rows, columns) = self.matrix.dim();
            hasher.write_usize(rows);
            hasher.write_usize(columns);
            for &value in &self.matrix {
                hasher.write_u32(value.to_bits());
            }
            hasher.finish()
        })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn one_hot_consensus() {
        let pwm = Pwm::from_consensus(b"ACGT").unwrap();
        assert_eq!(pwm.len(), 4);
        assert_eq!(
            *pwm.matrix(),
            array![
                [1., 0., 0., 0.],
                [0., 1., 0., 0.],
                [0., 0., 1., 0.],
                [0., 0., 0., 1.],
            ],
        );
    }

    #[test]
    fn consensus_rejects_unknown_bases() {
        assert!(matches!(
            Pwm::from_consensus(b"ACNT"),
            Err(Error::InvalidBase('N')),
        ));
    }

    #[test]
    fn shape_validation() {
        assert!(matches!(
            Pwm::new(Array2::zeros((3, 5))),
            Err(Error::InvalidShape {
                rows: 3,
                columns: 5,
            }),
        ));
        assert!(matches!(
            Pwm::new(Array2::zeros((4, 0))),
            Err(Error::InvalidShape {
                rows: 4,
                columns: 0,
            }),
        ));
        assert!(Pwm::new(Array2::zeros((4, 1))).is_ok());
    }

    #[test]
    fn reverse_complement_swaps_rows_and_columns() {
        let pwm = Pwm::from_consensus(b"AACG").unwrap();
        let rc = pwm.reverse_complement();
        assert_eq!(rc, Pwm::from_consensus(b"CGTT").unwrap());
        assert_eq!(rc.reverse_complement(), pwm);
    }

    #[test]
    fn acgt_is_palindromic_under_reverse_complement() {
        let pwm = Pwm::from_consensus(b"ACGT").unwrap();
        assert_eq!(pwm.reverse_complement(), pwm);
    }

    #[test]
    fn base_complement() {
        assert_eq!(Base::A.complement(), Base::T);
        assert_eq!(Base::T.complement(), Base::A);
        assert_eq!(Base::C.complement(), Base::G);
        assert_eq!(Base::G.complement(), Base::C);
    }

    #[test]
    fn content_hash_tracks_content() {
        let a = Pwm::from_consensus(b"ACGT").unwrap();
        let b = Pwm::from_consensus(b"ACGT").unwrap();
        let c = Pwm::from_consensus(b"ACGG").unwrap();

        assert_eq!(a.content_hash(), a.content_hash());
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
    }

    #[test]
    fn column_norms() {
        let pwm = Pwm::new(array![[3., 0.], [4., 1.], [0., 0.], [0., 0.]]).unwrap();
        let norms = pwm.column_norms();
        assert!((norms[0] - 5.).abs() < f32::EPSILON);
        assert!((norms[1] - 1.).abs() < f32::EPSILON);
    }
}
