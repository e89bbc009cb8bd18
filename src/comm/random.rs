use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};

/// 使用操作系统熵源生成字母数字随机串
/// Alphanumeric string drawn from the OS CSPRNG
pub fn random_string(len: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
