//! 序列目录
//!
//! 持有多个 [`Skill`]，同一时刻最多一个处于激活状态。
//!
//! # 导入规则
//!
//! - 根节点是数组：替换整个目录，激活第一个序列
//! - 根节点是单个对象：追加到目录并激活
//! - 任何一条记录不合法：整个导入被拒绝，目录保持不变

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use luci_protocol::ProtocolError;
use serde_json::Value;
use thiserror::Error;

use crate::skill::Skill;

/// 新建序列的名称前缀
pub const NEW_SKILL_PREFIX: &str = "NEW_SEQUENCE_";

/// 目录 / 表格错误类型
#[derive(Error, Debug)]
pub enum CatalogError {
    /// JSON 语法或结构不合法
    #[error("Invalid sequence file: {0}")]
    InvalidFile(#[from] serde_json::Error),

    /// 表格文件不合法
    #[error("Invalid table file: {0}")]
    InvalidTable(String),

    #[error("Skill not found: {0}")]
    SkillNotFound(String),

    #[error("No active skill")]
    NoActiveSkill,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// 序列目录
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillCatalog {
    skills: Vec<Skill>,
    active: Option<String>,
}

impl SkillCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.id == id)
    }

    /// 按名称查找（第一个匹配）
    pub fn find_by_name(&self, name: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.name == name)
    }

    /// 新建空序列（命名为 `NEW_SEQUENCE_<n>`）并激活
    pub fn create_skill(&mut self) -> &mut Skill {
        let skill = Skill::new(format!("{NEW_SKILL_PREFIX}{}", self.skills.len() + 1));
        self.add_skill(skill)
    }

    /// 追加序列并激活
    pub fn add_skill(&mut self, skill: Skill) -> &mut Skill {
        self.active = Some(skill.id.clone());
        let index = self.skills.len();
        self.skills.push(skill);
        &mut self.skills[index]
    }

    /// 删除序列；删除的是激活序列时清除激活状态
    pub fn remove_skill(&mut self, id: &str) -> Option<Skill> {
        let index = self.skills.iter().position(|s| s.id == id)?;
        if self.active.as_deref() == Some(id) {
            self.active = None;
        }
        Some(self.skills.remove(index))
    }

    pub fn activate(&mut self, id: &str) -> Result<(), CatalogError> {
        if self.get(id).is_none() {
            return Err(CatalogError::SkillNotFound(id.to_string()));
        }
        self.active = Some(id.to_string());
        Ok(())
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active(&self) -> Option<&Skill> {
        let id = self.active.as_deref()?;
        self.get(id)
    }

    pub fn active_mut(&mut self) -> Option<&mut Skill> {
        let id = self.active.clone()?;
        self.skills.iter_mut().find(|s| s.id == id)
    }

    /// 设置激活序列的循环标志
    pub fn set_looping(&mut self, looping: bool) -> Result<(), CatalogError> {
        let skill = self.active_mut().ok_or(CatalogError::NoActiveSkill)?;
        skill.looping = looping;
        Ok(())
    }

    /// 导出为带缩进的 JSON 数组
    pub fn export_json(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(&self.skills)?)
    }

    /// 导入 JSON，返回导入的序列数量
    ///
    /// 解析和校验全部通过后才修改目录。
    pub fn import_json(&mut self, text: &str) -> Result<usize, CatalogError> {
        let root: Value = serde_json::from_str(text)?;

        if root.is_array() {
            let skills: Vec<Skill> = serde_json::from_value(root)?;
            let count = skills.len();
            self.active = skills.first().map(|s| s.id.clone());
            self.skills = skills;
            Ok(count)
        } else {
            let skill: Skill = serde_json::from_value(root)?;
            self.add_skill(skill);
            Ok(1)
        }
    }

    /// 保存到文件（JSON）
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = self.export_json().context("序列化序列目录失败")?;
        fs::write(path.as_ref(), json)
            .with_context(|| format!("写入序列文件失败: {}", path.as_ref().display()))?;
        Ok(())
    }

    /// 从文件加载（替换规则同 [`import_json`](Self::import_json)，作用于新目录）
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())
            .with_context(|| format!("读取序列文件失败: {}", path.as_ref().display()))?;
        let mut catalog = Self::new();
        catalog.import_json(&text).context("解析序列文件失败")?;
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luci_protocol::{ServoKind, incremental_roster};

    fn catalog_with_frames() -> SkillCatalog {
        let roster = incremental_roster(2, ServoKind::Standard).unwrap();
        let mut catalog = SkillCatalog::new();
        let skill = catalog.create_skill();
        skill.capture(&roster);
        skill.capture(&roster);
        catalog
    }

    #[test]
    fn test_create_skill_names_and_activates() {
        let mut catalog = SkillCatalog::new();
        let first = catalog.create_skill().id.clone();
        let second = catalog.create_skill().id.clone();

        assert_eq!(catalog.skills()[0].name, "NEW_SEQUENCE_1");
        assert_eq!(catalog.skills()[1].name, "NEW_SEQUENCE_2");
        assert_eq!(catalog.active_id(), Some(second.as_str()));

        catalog.activate(&first).unwrap();
        assert_eq!(catalog.active().unwrap().id, first);
        assert!(matches!(
            catalog.activate("nope"),
            Err(CatalogError::SkillNotFound(_))
        ));
    }

    #[test]
    fn test_remove_active_clears_selection() {
        let mut catalog = SkillCatalog::new();
        let id = catalog.create_skill().id.clone();
        assert!(catalog.remove_skill(&id).is_some());
        assert!(catalog.active().is_none());
        assert!(matches!(
            catalog.set_looping(true),
            Err(CatalogError::NoActiveSkill)
        ));
    }

    #[test]
    fn test_set_looping() {
        let mut catalog = catalog_with_frames();
        catalog.set_looping(true).unwrap();
        assert!(catalog.active().unwrap().looping);
    }

    #[test]
    fn test_import_array_replaces_catalog() {
        let source = catalog_with_frames();
        let json = source.export_json().unwrap();

        let mut target = SkillCatalog::new();
        target.create_skill();
        target.create_skill();

        assert_eq!(target.import_json(&json).unwrap(), 1);
        assert_eq!(target.len(), 1);
        assert_eq!(target.active().unwrap().id, source.skills()[0].id);
    }

    #[test]
    fn test_import_single_object_appends() {
        let mut catalog = catalog_with_frames();
        let single = serde_json::to_string(&Skill::new("extra")).unwrap();

        assert_eq!(catalog.import_json(&single).unwrap(), 1);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.active().unwrap().name, "extra");
    }

    #[test]
    fn test_invalid_import_leaves_catalog_untouched() {
        let mut catalog = catalog_with_frames();
        let before = catalog.clone();

        let bad_servo = r#"[{"id":"a","name":"x","frames":[{"id":"f","servos":[
            {"servoId":0,"servoType":"AX-12A","angle":10,"velocity":100}
        ],"duration":1,"hold":1}]}]"#;
        assert!(catalog.import_json(bad_servo).is_err());

        let unknown_type = r#"{"id":"a","name":"x","frames":[{"id":"f","servos":[
            {"servoId":1,"servoType":"XL-320","angle":10,"velocity":100}
        ],"duration":1,"hold":1}]}"#;
        assert!(catalog.import_json(unknown_type).is_err());

        assert!(matches!(
            catalog.import_json("not json"),
            Err(CatalogError::InvalidFile(_))
        ));
        assert!(catalog.import_json(r#"{"name":"missing id"}"#).is_err());

        assert_eq!(catalog, before);
    }

    #[test]
    fn test_import_defaults_optional_fields() {
        let json = r#"[{"id":"abc","name":"legacy","frames":[{"id":"f1","servos":[
            {"id":7,"servoId":2,"servoType":"MX-64","angle":400,"velocity":2000}
        ],"duration":100,"hold":0}]}]"#;

        let mut catalog = SkillCatalog::new();
        catalog.import_json(json).unwrap();
        let skill = catalog.active().unwrap();
        assert!(!skill.looping);
        assert_eq!(skill.created_at, 0);

        let servo = &skill.frames[0].servos[0];
        // id 由 servoId 重新推导，角度与速度被钳位
        assert_eq!(servo.active_id(), 1);
        assert!(servo.is_active());
        assert_eq!(servo.angle(), 360.0);
        assert_eq!(servo.velocity(), 1023);
    }

    #[test]
    fn test_save_and_load() {
        let catalog = catalog_with_frames();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skills.json");

        catalog.save(&path).unwrap();
        let loaded = SkillCatalog::load(&path).unwrap();
        assert_eq!(loaded.skills(), catalog.skills());
        assert!(SkillCatalog::load(dir.path().join("missing.json")).is_err());
    }
}
