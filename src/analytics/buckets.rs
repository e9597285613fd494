//! 会话时长分桶
//!
//! 五个固定区间，左闭右开，覆盖全部非负时长且互不重叠。

/// 一个时长区间 `[min_secs, max_secs)`，`max_secs == None` 表示无上界
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionBucket {
    pub label: &'static str,
    pub min_secs: i64,
    pub max_secs: Option<i64>,
}

impl SessionBucket {
    pub fn contains(&self, duration: i64) -> bool {
        duration >= self.min_secs && self.max_secs.is_none_or(|max| duration < max)
    }
}

pub const SESSION_BUCKETS: [SessionBucket; 5] = [
    SessionBucket {
        label: "< 1 min",
        min_secs: 0,
        max_secs: Some(60),
    },
    SessionBucket {
        label: "1-3 min",
        min_secs: 60,
        max_secs: Some(180),
    },
    SessionBucket {
        label: "3-5 min",
        min_secs: 180,
        max_secs: Some(300),
    },
    SessionBucket {
        label: "5-10 min",
        min_secs: 300,
        max_secs: Some(600),
    },
    SessionBucket {
        label: "> 10 min",
        min_secs: 600,
        max_secs: None,
    },
];

/// 时长所属分桶下标；负数归入第一个桶
pub fn bucket_index(duration: i64) -> usize {
    SESSION_BUCKETS
        .iter()
        .position(|bucket| bucket.contains(duration))
        .unwrap_or(0)
}
