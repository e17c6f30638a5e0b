/// Whether any consumer is attached to a gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Activation {
    #[default]
    Inactive,
    Active,
}

impl Activation {
    pub fn from_count(count: usize) -> Self { if count > 0 { Activation::Active } else { Activation::Inactive } }

    pub fn is_active(self) -> bool { self == Activation::Active }
}

impl std::fmt::Display for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Activation::Inactive => write!(f, "inactive"),
            Activation::Active => write!(f, "active"),
        }
    }
}

/// Filters a sequence of activation states down to the transitions worth acting on.
///
/// The first value is only recorded as the baseline. After that, a value is reported
/// when it differs from the last one recorded, and repeats are ignored.
#[derive(Debug, Default, Clone)]
pub struct Transitions {
    last: Option<Activation>,
}

impl Transitions {
    pub fn new() -> Self { Self { last: None } }

    /// Record `next`, returning it if it is a transition away from the previous value
    pub fn observe(&mut self, next: Activation) -> Option<Activation> {
        match self.last.replace(next) {
            Some(previous) if previous != next => Some(next),
            _ => None,
        }
    }

    /// The last value recorded, if any
    pub fn current(&self) -> Option<Activation> { self.last }
}
