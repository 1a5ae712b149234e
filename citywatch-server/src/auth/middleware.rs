//! 认证中间件
//!
//! 为 JWT 认证和授权提供 Axum 中间件

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppError;
use crate::auth::{CurrentUser, JwtError, JwtService};
use crate::core::ServerState;
use crate::security_log;

/// 认证中间件
///
/// 若存在 `Authorization: Bearer <token>` 头则验证 JWT，成功后将
/// [`CurrentUser`] 注入请求扩展。没有该头的请求以匿名身份继续，
/// 由 [`CurrentUser`] 提取器在需要登录的接口上拒绝。
///
/// # 错误处理
///
/// | 错误 | HTTP 状态码 |
/// |------|------------|
/// | 非 Bearer 头 | 401 TokenInvalid |
/// | 令牌过期 | 401 TokenExpired |
/// | 无效令牌 | 401 TokenInvalid |
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 允许 CORS 预检的 OPTIONS 请求 (跳过认证)
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(header) = auth_header else {
        return Ok(next.run(req).await);
    };

    let token = JwtService::extract_from_header(header)
        .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?;

    match state.get_jwt_service().validate_token(token) {
        Ok(claims) => {
            let user = CurrentUser::from(claims);
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
        Err(e) => {
            security_log!(
                "WARN",
                "auth_failed",
                error = format!("{}", e),
                uri = format!("{:?}", req.uri())
            );

            match e {
                JwtError::ExpiredToken => Err(AppError::token_expired()),
                _ => Err(AppError::invalid_token("Invalid token")),
            }
        }
    }
}

/// 管理员中间件 - 要求管理员角色
///
/// # 错误
///
/// 未登录返回 401，非管理员返回 403 AdminRequired
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let user = req.current_user()?;
    if !user.is_admin() {
        security_log!(
            "WARN",
            "admin_required",
            email = user.email.clone(),
            user_role = user.role.as_str(),
            uri = format!("{:?}", req.uri())
        );
        return Err(AppError::admin_required());
    }

    Ok(next.run(req).await)
}

/// 从请求中提取 CurrentUser 的扩展方法
pub trait CurrentUserExt {
    /// 从请求扩展中获取 CurrentUser
    ///
    /// # 错误
    ///
    /// 未认证返回 401 Unauthorized
    fn current_user(&self) -> Result<&CurrentUser, AppError>;
}

impl CurrentUserExt for Request {
    fn current_user(&self) -> Result<&CurrentUser, AppError> {
        match self.extensions().get::<CurrentUser>() {
            Some(user) => Ok(user),
            None => {
                security_log!("WARN", "auth_missing", uri = format!("{:?}", self.uri()));
                Err(AppError::unauthorized())
            }
        }
    }
}
