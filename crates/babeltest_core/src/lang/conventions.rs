//! Shared adapter conventions (well-known identifiers).

/// Builder name a type registers to supply its own test instance.
pub const TEST_FACTORY_NAME: &str = "test_factory";

/// Leading marker some codebases put on capability names (`IPaymentGateway`).
pub const CAPABILITY_MARKER: char = 'I';

/// Default factories directory, relative to the project root.
pub const DEFAULT_FACTORIES_PATH: &str = "babel/factories";

/// Extension of declarative factory files.
pub const FACTORY_FILE_EXTENSION: &str = "json";

/// Key inside a factory `args` object that requests a nested constructed instance.
pub const FACTORY_TYPE_REF_KEY: &str = "$type";

/// Mock `given` matcher that matches every call.
pub const ANY_MATCHER: &str = "any";

/// Separator between segments of a target path.
pub const PATH_SEPARATOR: char = '.';
