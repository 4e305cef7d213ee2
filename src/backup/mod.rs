pub mod archive;
pub mod artifact;
pub mod backup_config;
pub mod change_gate;
pub mod compress;
pub mod encrypt;
pub mod file_ext;
pub mod finish;
pub mod notifications;
pub mod pipeline;
pub mod publish;
pub mod redacted;
pub mod result_error;
pub mod retention;
pub mod tar;
pub mod validate;

macro_rules! function_path {
    () => {
        concat!(module_path!(), "::", function_name!(), " ", file!(), ":", line!())
    };
}

pub(crate) use function_path;
