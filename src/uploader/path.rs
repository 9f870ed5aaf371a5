// 远端路径规范化
//
// 网盘授权应用只能写入 /apps/<应用名>/ 命名空间，所有用户侧路径在发起
// 任何请求前统一映射到该命名空间下。

/// 远端路径映射器
///
/// 纯函数式组件，无 I/O，不会失败；幂等（对规范化结果再规范化不变）。
#[derive(Debug, Clone)]
pub struct RemotePathMapper {
    /// 应用根目录，形如 `/apps/Neat Reader`
    root: String,
}

impl RemotePathMapper {
    pub fn new(app_name: &str) -> Self {
        let root = format!("/{}", join_segments(&format!("apps/{}", app_name)));
        Self { root }
    }

    /// 应用根目录
    pub fn root(&self) -> &str {
        &self.root
    }

    /// 将用户侧路径映射为后端要求的绝对路径
    ///
    /// - 保证恰好一个前导分隔符，重复分隔符合并为一个
    /// - 前缀应用根目录；已带根目录的输入不会二次前缀
    /// - 空输入返回应用根目录本身
    pub fn normalize(&self, user_path: &str) -> String {
        let joined = join_segments(user_path);
        if joined.is_empty() {
            return self.root.clone();
        }

        let candidate = format!("/{}", joined);
        if candidate == self.root || candidate.starts_with(&format!("{}/", self.root)) {
            candidate
        } else {
            format!("{}{}", self.root, candidate)
        }
    }
}

/// 去掉空段后用单个分隔符重新拼接（不带前导分隔符）
fn join_segments(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mapper() -> RemotePathMapper {
        RemotePathMapper::new("Neat Reader")
    }

    #[test]
    fn test_empty_path_yields_root() {
        let m = mapper();
        assert_eq!(m.normalize(""), "/apps/Neat Reader");
        assert_eq!(m.normalize("/"), "/apps/Neat Reader");
        assert_eq!(m.normalize("///"), "/apps/Neat Reader");
    }

    #[test]
    fn test_prefix_and_collapse() {
        let m = mapper();
        assert_eq!(m.normalize("books"), "/apps/Neat Reader/books");
        assert_eq!(m.normalize("/books/"), "/apps/Neat Reader/books");
        assert_eq!(m.normalize("/a//b/"), "/apps/Neat Reader/a/b");
        assert_eq!(m.normalize("a///b//c"), "/apps/Neat Reader/a/b/c");
    }

    #[test]
    fn test_no_double_root() {
        let m = mapper();
        assert_eq!(
            m.normalize("/apps/Neat Reader/books"),
            "/apps/Neat Reader/books"
        );
        assert_eq!(m.normalize("/apps/Neat Reader"), "/apps/Neat Reader");
        // 前缀相似但不是根目录的路径照常前缀
        assert_eq!(
            m.normalize("/apps/Neat Reader2/books"),
            "/apps/Neat Reader/apps/Neat Reader2/books"
        );
    }

    proptest! {
        #[test]
        fn prop_idempotent(path in "[a-zA-Z0-9/_. -]{0,64}") {
            let m = mapper();
            let once = m.normalize(&path);
            prop_assert_eq!(m.normalize(&once), once.clone());
            // 结果不含重复分隔符，且以单个分隔符开头
            prop_assert!(once.starts_with('/'));
            prop_assert!(!once.contains("//"));
        }
    }
}
