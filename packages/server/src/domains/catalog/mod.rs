//! Model-bundle catalog: the static bundle table, device-profile probing,
//! recommendation, and the guarded local install path.

mod bundles;
mod device;

pub use bundles::{
    catalog_bundles, default_bundle_name, recommend_bundles, seed_rows, BundleSpec, InstallError,
    ModelManager,
};
pub use device::{detect_device_profile, DeviceProfile};
