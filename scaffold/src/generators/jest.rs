use super::*;

fn jest_config(src_dir: &str, dist_dir: &str) -> String {
	format!(
		r"
// DO NOT MODIFY
// This file is auto-generated (make changes to ./config/jest.config.js instead)

module.exports = {{
  automock: false,
  cacheDirectory: '<rootDir>/.jest',
  collectCoverage: false,
  coverageDirectory: './.coverage',
  collectCoverageFrom: ['./{src_dir}/**/*.{{js,jsx,ts,tsx}}'],
  preset: 'ts-jest',
  testEnvironment: 'node',
  moduleFileExtensions: ['ts', 'tsx', 'js', 'jsx'],
  testPathIgnorePatterns: ['/node_modules/', '/.cache/', '/.git/', '/{dist_dir}/'],
  watchPathIgnorePatterns: ['/node_modules/', '/.cache/', '/.git/', '/{dist_dir}/'],
  testRegex: '/__tests__/.+\\.test\\.(?:js|jsx|ts|tsx)$',
}};

try {{
  Object.assign(module.exports, require('./config/jest.config'));
}} catch (_err) {{}}
"
	)
}

/// Generates the configuration of the jest test runner.
#[derive(Debug, Clone, Copy, Default)]
pub struct JestGenerator;

#[async_trait]
impl Generator for JestGenerator {
	fn name(&self) -> &'static str {
		"jest"
	}

	fn dev_dependencies(&self) -> &'static [&'static str] {
		&["jest", "ts-jest", "@types/jest", "rimraf"]
	}

	async fn files(&self, vars: &Vars) -> ScaffoldResult<Vec<VirtualFile>> {
		let src_dir = vars.config.src_dir().await?;
		let dist_dir = vars.config.dist_dir().await?;

		Ok(vec![VirtualFile::new(
			["jest.config.js"],
			jest_config(&src_dir, &dist_dir),
		)])
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn directories_are_used() {
		let config = jest_config("lib", "build");

		assert!(config.contains("collectCoverageFrom: ['./lib/**/*.{js,jsx,ts,tsx}'],"));
		assert!(config.contains("'/.git/', '/build/'],"));
		assert!(config.contains(r"testRegex: '/__tests__/.+\.test\.(?:js|jsx|ts|tsx)$',"));
	}
}
