//! 客户端 IP 提取
//!
//! 限流按客户端 IP 计数，支持：
//! - 可信代理配置（rate_limit.trusted_proxies，IP 或 CIDR）
//! - 未配置时，私有地址来源自动视为反向代理

use std::net::{IpAddr, SocketAddr};

use actix_web::dev::ConnectionInfo;
use actix_web::http::header::HeaderMap;
use tracing::debug;

/// 检查 IP 是否为私有地址或 localhost
pub fn is_private_or_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // fc00::/7
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // fe80::/10
        }
    }
}

fn parse_ip(ip: &str) -> Option<IpAddr> {
    ip.parse::<SocketAddr>()
        .map(|addr| addr.ip())
        .or_else(|_| ip.parse::<IpAddr>())
        .ok()
}

/// 检查 IP 是否在可信代理列表中
pub fn is_trusted_proxy(ip: &str, trusted_proxies: &[String]) -> bool {
    let Some(ip_addr) = parse_ip(ip) else {
        return false;
    };

    trusted_proxies.iter().any(|proxy| {
        if proxy.contains('/') {
            ip_in_cidr(&ip_addr, proxy)
        } else {
            proxy.parse::<IpAddr>().is_ok_and(|p| p == ip_addr)
        }
    })
}

/// CIDR 检查
pub fn ip_in_cidr(ip: &IpAddr, cidr: &str) -> bool {
    let Some((network, prefix_len)) = cidr.split_once('/') else {
        return false;
    };
    let Ok(prefix_len) = prefix_len.parse::<u8>() else {
        return false;
    };
    let Ok(network_addr) = network.parse::<IpAddr>() else {
        return false;
    };

    match (ip, network_addr) {
        (IpAddr::V4(ip), IpAddr::V4(net)) => {
            if prefix_len > 32 {
                return false;
            }
            let mask = u32::MAX.checked_shl(32 - prefix_len as u32).unwrap_or(0);
            (u32::from_be_bytes(ip.octets()) & mask) == (u32::from_be_bytes(net.octets()) & mask)
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) => {
            if prefix_len > 128 {
                return false;
            }
            let mask = u128::MAX.checked_shl(128 - prefix_len as u32).unwrap_or(0);
            (u128::from_be_bytes(ip.octets()) & mask) == (u128::from_be_bytes(net.octets()) & mask)
        }
        _ => false,
    }
}

/// 从请求头提取转发的 IP（X-Forwarded-For 第一个，其次 X-Real-IP）
pub fn extract_forwarded_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.trim().to_string())
        })
}

/// 解析真实客户端 IP
///
/// 1. 配置了 trusted_proxies：仅当连接来自其中之一时才信任转发头
/// 2. 未配置：连接来自私有地址时使用转发头
/// 3. 否则使用连接 IP
pub fn resolve_client_ip(
    conn_info: &ConnectionInfo,
    headers: &HeaderMap,
    trusted_proxies: &[String],
) -> Option<String> {
    let peer = conn_info.peer_addr()?;
    let peer_ip = parse_ip(peer).map(|ip| ip.to_string()).unwrap_or_else(|| peer.to_string());

    if !trusted_proxies.is_empty() {
        if is_trusted_proxy(peer, trusted_proxies) {
            let real_ip = extract_forwarded_ip_from_headers(headers).unwrap_or(peer_ip);
            debug!("Trusted proxy {} -> client {}", peer, real_ip);
            return Some(real_ip);
        }
        return Some(peer_ip);
    }

    if parse_ip(peer).is_some_and(|ip| is_private_or_local(&ip))
        && let Some(real_ip) = extract_forwarded_ip_from_headers(headers)
    {
        debug!("Private peer {} forwarded for {}", peer, real_ip);
        return Some(real_ip);
    }

    Some(peer_ip)
}
