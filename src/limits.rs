/// Keys a sandbox can be asked to bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limit {
    VectorPoolCapacity,
    MatrixPoolCapacity,
    MaxOperations,
}

impl Limit {
    pub fn label(self) -> &'static str {
        match self {
            Limit::VectorPoolCapacity => "vector_pool_capacity",
            Limit::MatrixPoolCapacity => "matrix_pool_capacity",
            Limit::MaxOperations => "max_operations",
        }
    }
}

/// Permission/limit query interface supplied by whoever owns the sandbox.
///
/// `None` means "no opinion": the caller uses its own default, or no bound.
pub trait SandboxLimits {
    fn limit(&self, key: Limit) -> Option<u64>;
}

/// Limits that answer `None` for everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

impl SandboxLimits for Unlimited {
    fn limit(&self, _key: Limit) -> Option<u64> {
        None
    }
}

impl<F> SandboxLimits for F
where
    F: Fn(Limit) -> Option<u64>,
{
    fn limit(&self, key: Limit) -> Option<u64> {
        self(key)
    }
}
