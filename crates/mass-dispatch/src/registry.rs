//! 通知类型注册表
//!
//! 进程启动时构建一次的只读映射表，记录每种通知类型是否启用以及展示元数据。
//! 分发流水线在解析受众之前先经过这里的闸门：
//! 已禁用的类型在任何存储查询或网关调用之前即被拒绝。
//!
//! 变更类型配置属于重新部署，运行期不提供修改入口。
//!
//! ## 使用示例
//!
//! ```ignore
//! let registry = TypeRegistry::builtin().with_disabled(&["PROMOTION".to_string()]);
//!
//! let mut params = HashMap::new();
//! params.insert("order_no".to_string(), "SO-1001".to_string());
//! let rendered = registry.build_template("ORDER_SHIPPED", &params)?;
//! // rendered.body == "您的订单 SO-1001 已发货，请留意物流信息"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use crate::error::{DispatchError, Result};
use crate::models::{NotificationTemplate, RenderedTemplate, TypeDescriptor};

/// 匹配 `{{variable_name}}`，变量名支持字母、数字、下划线
static VARIABLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("模板变量正则必须合法"));

/// 通知类型注册表
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeDescriptor>,
}

impl TypeRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 内置类型表
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.register(
            descriptor("ORDER_PLACED", true, "下单成功", "receipt", true, false).with_template(
                "下单成功",
                "您的订单 {{order_no}} 已提交，我们会尽快为您处理",
            ),
        );
        registry.register(
            descriptor("ORDER_SHIPPED", true, "订单已发货", "local_shipping", true, true)
                .with_template("订单已发货", "您的订单 {{order_no}} 已发货，请留意物流信息"),
        );
        registry.register(
            descriptor("ORDER_DELIVERED", true, "订单已送达", "inventory", true, true)
                .with_template("订单已送达", "您的订单 {{order_no}} 已送达，感谢您的惠顾"),
        );
        // 取消订单由客服单独触达，不走群发
        registry.register(
            descriptor("ORDER_CANCELLED", false, "订单已取消", "cancel", true, false)
                .with_template("订单已取消", "您的订单 {{order_no}} 已取消，原因：{{reason}}"),
        );
        registry.register(
            descriptor("PROMOTION", true, "优惠活动", "local_offer", false, false)
                .with_template("{{campaign_name}}", "{{content}}"),
        );
        registry.register(descriptor(
            "SYSTEM_ANNOUNCEMENT",
            true,
            "系统公告",
            "campaign",
            true,
            true,
        ));

        registry
    }

    /// 注册（或覆盖）一种类型
    pub fn register(&mut self, entry: TypeEntry) {
        self.types.insert(entry.0.key.clone(), entry.0);
    }

    /// 按配置额外禁用若干类型，未知的键只记录警告
    pub fn with_disabled(mut self, keys: &[String]) -> Self {
        for key in keys {
            match self.types.get_mut(key) {
                Some(descriptor) => {
                    descriptor.enabled = false;
                    info!(notification_type = %key, "通知类型已按配置禁用");
                }
                None => warn!(notification_type = %key, "配置中禁用了未知的通知类型，已忽略"),
            }
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&TypeDescriptor> {
        self.types.get(key)
    }

    /// 类型是否启用，未知类型视为未启用
    pub fn is_enabled(&self, key: &str) -> bool {
        self.types.get(key).is_some_and(|d| d.enabled)
    }

    /// 分发闸门：未知类型返回 UnknownType，禁用类型返回 TypeDisabled
    pub fn check(&self, key: &str) -> Result<&TypeDescriptor> {
        let descriptor = self
            .types
            .get(key)
            .ok_or_else(|| DispatchError::UnknownType {
                key: key.to_string(),
            })?;

        if !descriptor.enabled {
            return Err(DispatchError::TypeDisabled {
                key: key.to_string(),
            });
        }

        Ok(descriptor)
    }

    /// 所有启用的类型，按键排序
    pub fn enabled_types(&self) -> BTreeMap<String, TypeDescriptor> {
        self.types
            .iter()
            .filter(|(_, d)| d.enabled)
            .map(|(k, d)| (k.clone(), d.clone()))
            .collect()
    }

    /// 启用类型的键列表，供到期查询过滤使用
    pub fn enabled_keys(&self) -> Vec<String> {
        self.enabled_types().into_keys().collect()
    }

    /// 用模板构建通知内容
    ///
    /// 只对定义了模板的类型可用，其余（包括未注册的键）返回 UnknownType。
    /// 是否启用不在这里判断，由分发闸门负责。
    pub fn build_template(
        &self,
        key: &str,
        params: &HashMap<String, String>,
    ) -> Result<RenderedTemplate> {
        let template = self
            .types
            .get(key)
            .and_then(|d| d.template.as_ref())
            .ok_or_else(|| DispatchError::UnknownType {
                key: key.to_string(),
            })?;

        Ok(RenderedTemplate {
            title: render(&template.title, params),
            body: render(&template.body, params),
            payload: RenderedTemplate::payload_from(key, params),
        })
    }
}

/// 替换 `{{variable}}`，缺失的变量替换为空串并记录警告
fn render(template: &str, params: &HashMap<String, String>) -> String {
    VARIABLE_REGEX
        .replace_all(template, |caps: &regex::Captures| {
            let var_name = &caps[1];
            match params.get(var_name) {
                Some(value) => value.clone(),
                None => {
                    warn!(variable = var_name, "模板变量未提供，按空值渲染");
                    String::new()
                }
            }
        })
        .into_owned()
}

/// 注册表条目构建器
pub struct TypeEntry(TypeDescriptor);

impl TypeEntry {
    pub fn with_template(mut self, title: &str, body: &str) -> Self {
        self.0.template = Some(NotificationTemplate::new(title, body));
        self
    }
}

/// 构造类型条目
pub fn descriptor(
    key: &str,
    enabled: bool,
    title: &str,
    icon: &str,
    sound: bool,
    vibration: bool,
) -> TypeEntry {
    TypeEntry(TypeDescriptor {
        key: key.to_string(),
        enabled,
        title: title.to_string(),
        icon: icon.to_string(),
        sound,
        vibration,
        template: None,
    })
}
