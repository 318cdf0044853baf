//! Built-in sample model: user management data
//!
//! A small package with typed proxies, used by the CLI demo, the benches
//! and the integration tests. Feature-id constants follow the flattened
//! feature order of each class.

use std::sync::Arc;

use crate::error::BridgeResult;
use crate::schema::{ClassSchema, Package};
use crate::value::ValueKind;

/// Package name
pub const PACKAGE_NAME: &str = "vishnu";
/// Package namespace URI
pub const NS_URI: &str = "urn:vishnu:data";

/// Feature ids of `OptionValue`
pub mod option_value {
    use crate::schema::FeatureId;

    /// `optionName`
    pub const OPTION_NAME: FeatureId = FeatureId(0);
    /// `value`
    pub const VALUE: FeatureId = FeatureId(1);
}

/// Feature ids of `LocalAccount`
pub mod local_account {
    use crate::schema::FeatureId;

    /// `userId`
    pub const USER_ID: FeatureId = FeatureId(0);
    /// `machineId`
    pub const MACHINE_ID: FeatureId = FeatureId(1);
    /// `acLogin`
    pub const AC_LOGIN: FeatureId = FeatureId(2);
    /// `sshKeyPath`
    pub const SSH_KEY_PATH: FeatureId = FeatureId(3);
    /// `homeDirectory`
    pub const HOME_DIRECTORY: FeatureId = FeatureId(4);
}

/// Feature ids of `JobOutputOptions`
pub mod job_output_options {
    use crate::schema::FeatureId;

    /// `machineId`
    pub const MACHINE_ID: FeatureId = FeatureId(0);
    /// `outputDir`
    pub const OUTPUT_DIR: FeatureId = FeatureId(1);
    /// `days`
    pub const DAYS: FeatureId = FeatureId(2);
}

/// Feature ids of `ListOptionsValues`
pub mod list_options_values {
    use crate::schema::FeatureId;

    /// `optionValues`
    pub const OPTION_VALUES: FeatureId = FeatureId(0);
}

/// Build the sample package
pub fn build_package() -> BridgeResult<Package> {
    Package::builder(PACKAGE_NAME, NS_URI)
        .class(
            ClassSchema::builder("OptionValue")
                .attribute("optionName", ValueKind::String)
                .attribute("value", ValueKind::String)
                .build(),
        )
        .class(
            ClassSchema::builder("LocalAccount")
                .attribute("userId", ValueKind::String)
                .attribute("machineId", ValueKind::String)
                .attribute("acLogin", ValueKind::String)
                .attribute("sshKeyPath", ValueKind::String)
                .attribute("homeDirectory", ValueKind::String)
                .build(),
        )
        .class(
            ClassSchema::builder("JobOutputOptions")
                .attribute("machineId", ValueKind::String)
                .attribute("outputDir", ValueKind::String)
                .attribute("days", ValueKind::Int)
                .build(),
        )
        .class(
            ClassSchema::builder("ListOptionsValues")
                .many_reference("optionValues", "OptionValue")
                .build(),
        )
        .build()
}

/// The sample package, shared
pub fn package() -> BridgeResult<Arc<Package>> {
    build_package().map(Arc::new)
}

crate::proxy_class! {
    /// One named option and its value
    pub struct OptionValue("OptionValue") {
        attr option_name / set_option_name: String = option_value::OPTION_NAME;
        attr value / set_value: String = option_value::VALUE;
    }
}

crate::proxy_class! {
    /// A user's account on one machine
    pub struct LocalAccount("LocalAccount") {
        attr user_id / set_user_id: String = local_account::USER_ID;
        attr machine_id / set_machine_id: String = local_account::MACHINE_ID;
        attr ac_login / set_ac_login: String = local_account::AC_LOGIN;
        attr ssh_key_path / set_ssh_key_path: String = local_account::SSH_KEY_PATH;
        attr home_directory / set_home_directory: String = local_account::HOME_DIRECTORY;
    }
}

crate::proxy_class! {
    /// Where job outputs go and how long they are kept
    pub struct JobOutputOptions("JobOutputOptions") {
        attr machine_id / set_machine_id: String = job_output_options::MACHINE_ID;
        attr output_dir / set_output_dir: String = job_output_options::OUTPUT_DIR;
        attr days / set_days: i32 = job_output_options::DAYS;
    }
}

crate::proxy_class! {
    /// A list of option values
    pub struct ListOptionsValues("ListOptionsValues") {
        list option_values: OptionValue = list_options_values::OPTION_VALUES;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FeatureId;

    #[test]
    fn test_constants_match_schema() {
        let package = build_package().unwrap();
        let check = |class: &str, feature: &str, id: FeatureId| {
            let schema = package.require_by_name(class).unwrap();
            assert_eq!(schema.feature_id(feature).unwrap(), id, "{}.{}", class, feature);
        };

        check("OptionValue", "optionName", option_value::OPTION_NAME);
        check("OptionValue", "value", option_value::VALUE);
        check("LocalAccount", "userId", local_account::USER_ID);
        check("LocalAccount", "machineId", local_account::MACHINE_ID);
        check("LocalAccount", "acLogin", local_account::AC_LOGIN);
        check("LocalAccount", "sshKeyPath", local_account::SSH_KEY_PATH);
        check("LocalAccount", "homeDirectory", local_account::HOME_DIRECTORY);
        check("JobOutputOptions", "machineId", job_output_options::MACHINE_ID);
        check("JobOutputOptions", "outputDir", job_output_options::OUTPUT_DIR);
        check("JobOutputOptions", "days", job_output_options::DAYS);
        check("ListOptionsValues", "optionValues", list_options_values::OPTION_VALUES);
    }

    #[test]
    fn test_package_shape() {
        let package = package().unwrap();
        assert_eq!(package.name(), PACKAGE_NAME);
        assert_eq!(package.class_count(), 4);
        let list = package.require_by_name("ListOptionsValues").unwrap();
        assert!(list.feature(list_options_values::OPTION_VALUES).unwrap().kind().is_many());
    }
}
