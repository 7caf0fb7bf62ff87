mod convention_list_ext;

pub use self::convention_list_ext::ConventionListExt;
