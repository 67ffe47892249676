//! # 数据模型模块
//!
//! 定义晶格、误差规格和安装配置的数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`、`archive/` 和 `commands/` 使用
//! - 子模块: lattice, error_spec, profile

pub mod error_spec;
pub mod lattice;
pub mod profile;

pub use error_spec::{Facility, FacilityErrorSpec, Tges};
pub use lattice::{Element, Lattice};
pub use profile::{ConsoleTool, DependencyGroup, InstallProfile};
