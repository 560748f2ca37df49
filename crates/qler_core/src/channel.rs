//! Single-qubit noise channels and channel families.
//!
//! A channel instance is an ordered set of 2x2 Kraus operators satisfying
//! the completeness relation `Σ K_j† K_j = I`. A family maps a scalar
//! strength in [0, 1] to an instance; every standard family is the identity
//! channel at strength 0.

use crate::state::{Matrix2, gates};
use crate::{QlerError, Result};
use num_complex::Complex64;
use std::fmt;
use std::sync::Arc;

/// Validated single-qubit Kraus channel.
#[derive(Clone, Debug)]
pub struct KrausChannel {
    operators: Vec<Matrix2>,
}

impl KrausChannel {
    /// Maximum deviation of `Σ K†K` from the identity, entry by entry.
    pub const COMPLETENESS_TOLERANCE: f64 = 1e-9;

    /// Builds a channel, rejecting operator sets that are empty, contain
    /// non-finite entries or are not trace preserving.
    pub fn new(operators: Vec<Matrix2>) -> Result<Self> {
        if operators.is_empty() {
            return Err(QlerError::InvalidChannel("no Kraus operators".into()));
        }
        if operators
            .iter()
            .flatten()
            .flatten()
            .any(|c| !c.re.is_finite() || !c.im.is_finite())
        {
            return Err(QlerError::InvalidChannel(
                "Kraus operator has a non-finite entry".into(),
            ));
        }

        let mut sum = [[Complex64::new(0.0, 0.0); 2]; 2];
        for k in &operators {
            for (r, row) in sum.iter_mut().enumerate() {
                for (c, entry) in row.iter_mut().enumerate() {
                    // (K†K)[r][c] = Σ_m conj(K[m][r]) K[m][c]
                    *entry += k[0][r].conj() * k[0][c] + k[1][r].conj() * k[1][c];
                }
            }
        }
        let id = gates::identity();
        for r in 0..2 {
            for c in 0..2 {
                if (sum[r][c] - id[r][c]).norm() > Self::COMPLETENESS_TOLERANCE {
                    return Err(QlerError::InvalidChannel(format!(
                        "Σ K†K deviates from identity at ({}, {}): {}",
                        r, c, sum[r][c]
                    )));
                }
            }
        }

        Ok(Self { operators })
    }

    /// The noiseless channel.
    pub fn identity() -> Self {
        Self {
            operators: vec![gates::identity()],
        }
    }

    pub fn operators(&self) -> &[Matrix2] {
        &self.operators
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

/// A named map from strength in [0, 1] to a channel instance.
pub trait NoiseChannelFamily: Send + Sync {
    /// Display name, also used as the plot label.
    fn name(&self) -> &str;

    /// Channel at the given strength. Fails with `InvalidStrength` outside
    /// [0, 1].
    fn channel(&self, strength: f64) -> Result<KrausChannel>;
}

/// Rejects NaN and values outside [0, 1].
pub fn check_strength(channel: &str, strength: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&strength) {
        return Err(QlerError::InvalidStrength {
            channel: channel.to_string(),
            strength,
        });
    }
    Ok(())
}

/// Built-in channel families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StandardChannel {
    /// `K0 = [[1, 0], [0, √(1-p)]]`, `K1 = [[0, √p], [0, 0]]`.
    AmplitudeDamping,
    /// `√(1-p/2) I`, `√(p/2) Z`.
    Dephasing,
    /// `√(1-p) I`, `√p X`.
    BitFlip,
    /// `√(1-p) I`, `√p Z`.
    PhaseFlip,
    /// `√(1-3p/4) I`, `√(p/4) X`, `√(p/4) Y`, `√(p/4) Z`. Fully depolarizing at p = 1.
    Depolarizing,
}

impl StandardChannel {
    pub const ALL: [StandardChannel; 5] = [
        StandardChannel::AmplitudeDamping,
        StandardChannel::Dephasing,
        StandardChannel::BitFlip,
        StandardChannel::PhaseFlip,
        StandardChannel::Depolarizing,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StandardChannel::AmplitudeDamping => "amplitude damping",
            StandardChannel::Dephasing => "dephasing",
            StandardChannel::BitFlip => "bit flip",
            StandardChannel::PhaseFlip => "phase flip",
            StandardChannel::Depolarizing => "depolarizing",
        }
    }

    fn kraus(&self, p: f64) -> Vec<Matrix2> {
        let zero = Complex64::new(0.0, 0.0);
        match self {
            StandardChannel::AmplitudeDamping => vec![
                [
                    [Complex64::new(1.0, 0.0), zero],
                    [zero, Complex64::new((1.0 - p).sqrt(), 0.0)],
                ],
                [[zero, Complex64::new(p.sqrt(), 0.0)], [zero, zero]],
            ],
            StandardChannel::Dephasing => vec![
                gates::scaled(gates::identity(), (1.0 - p / 2.0).sqrt()),
                gates::scaled(gates::pauli_z(), (p / 2.0).sqrt()),
            ],
            StandardChannel::BitFlip => vec![
                gates::scaled(gates::identity(), (1.0 - p).sqrt()),
                gates::scaled(gates::pauli_x(), p.sqrt()),
            ],
            StandardChannel::PhaseFlip => vec![
                gates::scaled(gates::identity(), (1.0 - p).sqrt()),
                gates::scaled(gates::pauli_z(), p.sqrt()),
            ],
            StandardChannel::Depolarizing => {
                let e = (p / 4.0).sqrt();
                vec![
                    gates::scaled(gates::identity(), (1.0 - 3.0 * p / 4.0).sqrt()),
                    gates::scaled(gates::pauli_x(), e),
                    gates::scaled(gates::pauli_y(), e),
                    gates::scaled(gates::pauli_z(), e),
                ]
            }
        }
    }
}

impl fmt::Display for StandardChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl NoiseChannelFamily for StandardChannel {
    fn name(&self) -> &str {
        self.label()
    }

    fn channel(&self, strength: f64) -> Result<KrausChannel> {
        check_strength(self.label(), strength)?;
        KrausChannel::new(self.kraus(strength))
    }
}

fn normalize_label(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|c| match c {
            '_' | '-' => ' ',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Adapts a `(name, constructor)` pair into a channel family.
///
/// The strength is range-checked before the constructor runs.
pub struct FnChannelFamily<F> {
    name: String,
    constructor: F,
}

impl<F> FnChannelFamily<F>
where
    F: Fn(f64) -> Result<KrausChannel> + Send + Sync,
{
    pub fn new(name: impl Into<String>, constructor: F) -> Self {
        Self {
            name: name.into(),
            constructor,
        }
    }
}

impl<F> NoiseChannelFamily for FnChannelFamily<F>
where
    F: Fn(f64) -> Result<KrausChannel> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn channel(&self, strength: f64) -> Result<KrausChannel> {
        check_strength(&self.name, strength)?;
        (self.constructor)(strength)
    }
}

/// Ordered collection of channel families, looked up by name.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    families: Vec<Arc<dyn NoiseChannelFamily>>,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    ///
    /// Use [`ChannelRegistry::standard`] for the built-in families and
    /// [`ChannelRegistry::register`] to add custom ones.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the five standard families in their usual order.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for c in StandardChannel::ALL {
            registry.register(Arc::new(c));
        }
        registry
    }

    /// Adds a family, replacing any family with the same name in place.
    pub fn register(&mut self, family: Arc<dyn NoiseChannelFamily>) {
        let name = normalize_label(family.name());
        match self
            .families
            .iter()
            .position(|f| normalize_label(f.name()) == name)
        {
            Some(idx) => self.families[idx] = family,
            None => self.families.push(family),
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn NoiseChannelFamily>> {
        let wanted = normalize_label(name);
        self.families
            .iter()
            .find(|f| normalize_label(f.name()) == wanted)
            .cloned()
            .ok_or_else(|| QlerError::UnknownChannel(name.to_string()))
    }

    /// Resolves a list of names in order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Arc<dyn NoiseChannelFamily>>> {
        names.iter().map(|n| self.get(n.as_ref())).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.families.iter().map(|f| f.name()).collect()
    }

    /// Number of registered families.
    pub fn len(&self) -> usize {
        self.families.len()
    }

    /// True when no family has been registered.
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_channels_are_trace_preserving_across_the_range() {
        for family in StandardChannel::ALL {
            for i in 0..=20 {
                let p = i as f64 / 20.0;
                let ch = family.channel(p).unwrap();
                assert!(!ch.is_empty(), "{} at {}", family, p);
            }
        }
    }

    #[test]
    fn zero_strength_has_no_error_branch() {
        for family in StandardChannel::ALL {
            let ch = family.channel(0.0).unwrap();
            for k in &ch.operators()[1..] {
                assert!(k.iter().flatten().all(|c| c.norm() == 0.0), "{}", family);
            }
        }
    }

    #[test]
    fn out_of_range_strength_is_rejected() {
        let err = StandardChannel::BitFlip.channel(1.5).unwrap_err();
        assert!(matches!(err, QlerError::InvalidStrength { strength, .. } if strength == 1.5));
        assert!(StandardChannel::Depolarizing.channel(-0.1).is_err());
        assert!(StandardChannel::Dephasing.channel(f64::NAN).is_err());
    }

    #[test]
    fn non_trace_preserving_set_is_rejected() {
        let ops = vec![gates::identity(), gates::pauli_x()];
        assert!(matches!(
            KrausChannel::new(ops),
            Err(QlerError::InvalidChannel(_))
        ));
        assert!(KrausChannel::new(Vec::new()).is_err());
    }

    #[test]
    fn fn_family_checks_strength_first() {
        let family = FnChannelFamily::new("custom", |_p| Ok(KrausChannel::identity()));
        assert!(family.channel(0.3).is_ok());
        assert!(matches!(
            family.channel(2.0),
            Err(QlerError::InvalidStrength { .. })
        ));
    }

    #[test]
    fn registry_lookup() {
        assert!(ChannelRegistry::new().is_empty());
        let mut registry = ChannelRegistry::standard();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.get("bit_flip").unwrap().name(), "bit flip");
        assert!(matches!(
            registry.get("thermal"),
            Err(QlerError::UnknownChannel(_))
        ));

        registry.register(Arc::new(FnChannelFamily::new("Bit Flip", |_| {
            Ok(KrausChannel::identity())
        })));
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.names()[2], "Bit Flip");
        assert_eq!(
            registry.get("Amplitude-Damping").unwrap().name(),
            "amplitude damping"
        );
    }
}
